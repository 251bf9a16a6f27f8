//! DynamoDB implementation of StorageClient

use crate::core::client::{StorageClient, TableSpec};
use crate::core::error::{NoteError, NoteResult, ValidationError};
use crate::core::item::{Item, PrimaryKey};
use crate::core::query::{ContinuationToken, Filter, KeyCondition, Page, PageRequest, SortCondition};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDBClient;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use std::collections::HashMap;

const BACKEND: &str = "dynamodb";

type AttributeMap = HashMap<String, AttributeValue>;

/// DynamoDB implementation of StorageClient
///
/// Each call maps to exactly one DynamoDB request. The SDK's own retry
/// configuration still applies; this client adds none.
#[derive(Clone)]
pub struct DynamoDBStorageClient {
    client: DynamoDBClient,
}

impl DynamoDBStorageClient {
    pub fn new(client: DynamoDBClient) -> Self {
        Self { client }
    }

    fn key_attributes(table: &TableSpec, key: &PrimaryKey) -> AttributeMap {
        let mut attributes = HashMap::from([(
            table.schema.partition_key.clone(),
            AttributeValue::S(key.partition.clone()),
        )]);
        if let (Some(name), Some(sort)) = (&table.schema.sort_key, &key.sort) {
            attributes.insert(name.clone(), AttributeValue::S(sort.clone()));
        }
        attributes
    }
}

fn sdk_error(e: impl std::error::Error) -> NoteError {
    NoteError::transient(BACKEND, DisplayErrorContext(e))
}

fn to_attributes(item: Item) -> NoteResult<AttributeMap> {
    serde_dynamo::to_item(item).map_err(|e| {
        ValidationError::InvalidJson {
            message: e.to_string(),
        }
        .into()
    })
}

fn from_attributes(attributes: AttributeMap) -> NoteResult<Item> {
    serde_dynamo::from_item(attributes).map_err(|e| {
        ValidationError::InvalidJson {
            message: e.to_string(),
        }
        .into()
    })
}

fn to_attribute(value: &serde_json::Value) -> NoteResult<AttributeValue> {
    serde_dynamo::to_attribute_value(value).map_err(|e| {
        ValidationError::InvalidJson {
            message: e.to_string(),
        }
        .into()
    })
}

fn start_key(page: &PageRequest) -> NoteResult<Option<AttributeMap>> {
    page.start
        .as_ref()
        .map(|token| to_attributes(token.to_key_item()?))
        .transpose()
}

fn continuation(last_evaluated_key: Option<AttributeMap>) -> NoteResult<Option<ContinuationToken>> {
    last_evaluated_key
        .filter(|key| !key.is_empty())
        .map(|key| Ok(ContinuationToken::from_key_item(&from_attributes(key)?)))
        .transpose()
}

fn limit(page: &PageRequest) -> Option<i32> {
    page.limit.map(|l| i32::try_from(l).unwrap_or(i32::MAX))
}

fn sort_expression(condition: &SortCondition) -> (String, Vec<(&'static str, String)>) {
    match condition {
        SortCondition::Eq(v) => ("#sk = :sk".into(), vec![(":sk", v.clone())]),
        SortCondition::BeginsWith(v) => ("begins_with(#sk, :sk)".into(), vec![(":sk", v.clone())]),
        SortCondition::Between(low, high) => (
            "#sk BETWEEN :sk AND :sk_high".into(),
            vec![(":sk", low.clone()), (":sk_high", high.clone())],
        ),
        SortCondition::Lt(v) => ("#sk < :sk".into(), vec![(":sk", v.clone())]),
        SortCondition::Le(v) => ("#sk <= :sk".into(), vec![(":sk", v.clone())]),
        SortCondition::Gt(v) => ("#sk > :sk".into(), vec![(":sk", v.clone())]),
        SortCondition::Ge(v) => ("#sk >= :sk".into(), vec![(":sk", v.clone())]),
    }
}

#[async_trait]
impl StorageClient for DynamoDBStorageClient {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get_item(&self, table: &TableSpec, key: &PrimaryKey) -> NoteResult<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(&table.physical_name)
            .set_key(Some(Self::key_attributes(table, key)))
            .send()
            .await
            .map_err(sdk_error)?;

        result.item.map(from_attributes).transpose()
    }

    async fn put_item(&self, table: &TableSpec, item: Item) -> NoteResult<()> {
        self.client
            .put_item()
            .table_name(&table.physical_name)
            .set_item(Some(to_attributes(item)?))
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }

    async fn update_item(
        &self,
        table: &TableSpec,
        key: &PrimaryKey,
        patch: Item,
    ) -> NoteResult<Option<Item>> {
        if patch.is_empty() {
            return self.get_item(table, key).await;
        }

        let mut names = HashMap::from([("#pk".to_string(), table.schema.partition_key.clone())]);
        let mut values = HashMap::new();
        let mut assignments = Vec::with_capacity(patch.len());
        for (i, (attribute, value)) in patch.iter().enumerate() {
            names.insert(format!("#f{i}"), attribute.clone());
            values.insert(format!(":v{i}"), to_attribute(value)?);
            assignments.push(format!("#f{i} = :v{i}"));
        }

        let result = self
            .client
            .update_item()
            .table_name(&table.physical_name)
            .set_key(Some(Self::key_attributes(table, key)))
            .update_expression(format!("SET {}", assignments.join(", ")))
            .condition_expression("attribute_exists(#pk)")
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes.map(from_attributes).transpose(),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(sdk_error(e)),
        }
    }

    async fn delete_item(&self, table: &TableSpec, key: &PrimaryKey) -> NoteResult<()> {
        self.client
            .delete_item()
            .table_name(&table.physical_name)
            .set_key(Some(Self::key_attributes(table, key)))
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(())
    }

    async fn query(
        &self,
        table: &TableSpec,
        condition: &KeyCondition,
        page: &PageRequest,
    ) -> NoteResult<Page<Item>> {
        let mut names = HashMap::from([("#pk".to_string(), table.schema.partition_key.clone())]);
        let mut values = HashMap::from([(
            ":pk".to_string(),
            AttributeValue::S(condition.partition.clone()),
        )]);
        let mut expression = "#pk = :pk".to_string();

        if let (Some(sort), Some(sort_key)) = (&condition.sort, &table.schema.sort_key) {
            let (sort_expr, sort_values) = sort_expression(sort);
            names.insert("#sk".to_string(), sort_key.clone());
            for (placeholder, value) in sort_values {
                values.insert(placeholder.to_string(), AttributeValue::S(value));
            }
            expression = format!("{} AND {}", expression, sort_expr);
        }

        let result = self
            .client
            .query()
            .table_name(&table.physical_name)
            .key_condition_expression(expression)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .scan_index_forward(condition.scan_forward)
            .set_limit(limit(page))
            .set_exclusive_start_key(start_key(page)?)
            .send()
            .await
            .map_err(sdk_error)?;

        let items = result
            .items
            .unwrap_or_default()
            .into_iter()
            .map(from_attributes)
            .collect::<NoteResult<Vec<_>>>()?;
        Ok(Page::new(items, continuation(result.last_evaluated_key)?))
    }

    async fn scan(
        &self,
        table: &TableSpec,
        filter: Option<&Filter>,
        page: &PageRequest,
    ) -> NoteResult<Page<Item>> {
        let mut request = self
            .client
            .scan()
            .table_name(&table.physical_name)
            .set_limit(limit(page))
            .set_exclusive_start_key(start_key(page)?);

        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            let mut names = HashMap::new();
            let mut values = HashMap::new();
            let mut clauses = Vec::new();
            for (i, (attribute, value)) in filter.conditions().iter().enumerate() {
                names.insert(format!("#f{i}"), attribute.clone());
                values.insert(format!(":f{i}"), to_attribute(value)?);
                clauses.push(format!("#f{i} = :f{i}"));
            }
            request = request
                .filter_expression(clauses.join(" AND "))
                .set_expression_attribute_names(Some(names))
                .set_expression_attribute_values(Some(values));
        }

        let result = request.send().await.map_err(sdk_error)?;

        let items = result
            .items
            .unwrap_or_default()
            .into_iter()
            .map(from_attributes)
            .collect::<NoteResult<Vec<_>>>()?;
        Ok(Page::new(items, continuation(result.last_evaluated_key)?))
    }
}
