//! JavaScript execution for CDP page session.

use serde_json::{json, Value};

use crate::error::CdpError;
use crate::protocol::{ExceptionDetails, PropertyDescriptor, RemoteObject};

use super::core::PageSession;

fn check_exception(result: &Value) -> Result<(), CdpError> {
    match result.get("exceptionDetails") {
        Some(details) => {
            let message = serde_json::from_value::<ExceptionDetails>(details.clone())
                .map(|d| d.message())
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(CdpError::JavaScript(message))
        }
        None => Ok(()),
    }
}

impl PageSession {
    /// Evaluate an expression by value, in the page's main world or in the
    /// given execution context.
    pub async fn evaluate(&self, expression: &str, context_id: Option<i64>) -> Result<Value, CdpError> {
        let mut params = json!({
            "expression": expression,
            "returnByValue": true,
            "awaitPromise": true,
        });
        if let Some(id) = context_id {
            params["contextId"] = json!(id);
        }

        let result = self.call("Runtime.evaluate", Some(params)).await?;
        check_exception(&result)?;
        Ok(result["result"]["value"].clone())
    }

    /// Evaluate an expression and keep the result as a remote object.
    pub async fn evaluate_handle(
        &self,
        expression: &str,
        context_id: Option<i64>,
    ) -> Result<RemoteObject, CdpError> {
        let mut params = json!({
            "expression": expression,
            "returnByValue": false,
        });
        if let Some(id) = context_id {
            params["contextId"] = json!(id);
        }

        let result = self.call("Runtime.evaluate", Some(params)).await?;
        check_exception(&result)?;
        Ok(serde_json::from_value(result["result"].clone())?)
    }

    /// Call a function with `this` bound to a remote object.
    pub async fn call_function_on(
        &self,
        object_id: &str,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, CdpError> {
        let params = json!({
            "objectId": object_id,
            "functionDeclaration": function,
            "arguments": args.into_iter().map(|v| json!({"value": v})).collect::<Vec<_>>(),
            "returnByValue": true,
            "awaitPromise": true,
        });

        let result = self.call("Runtime.callFunctionOn", Some(params)).await?;
        check_exception(&result)?;
        Ok(result["result"]["value"].clone())
    }

    /// Object ids of an array's elements, in index order.
    pub async fn array_items(&self, object_id: &str) -> Result<Vec<String>, CdpError> {
        let result = self
            .call(
                "Runtime.getProperties",
                Some(json!({
                    "objectId": object_id,
                    "ownProperties": true,
                })),
            )
            .await?;

        let properties: Vec<PropertyDescriptor> = serde_json::from_value(result["result"].clone())?;
        let mut items: Vec<(usize, String)> = properties
            .into_iter()
            .filter_map(|p| {
                let index = p.name.parse::<usize>().ok()?;
                Some((index, p.value?.object_id?))
            })
            .collect();
        items.sort_by_key(|(index, _)| *index);
        Ok(items.into_iter().map(|(_, id)| id).collect())
    }

    /// Release a remote object. Failures are ignored.
    pub async fn release_object(&self, object_id: &str) {
        let _ = self
            .call("Runtime.releaseObject", Some(json!({"objectId": object_id})))
            .await;
    }
}
