//! Operations that write their result into a message variable.

use async_trait::async_trait;

use crate::context::constants;
use crate::context::params::{get_parameter, ParamType, ParamValue};
use crate::context::MessageContext;
use crate::error::ConnectorResult;

/// A connector operation driven by the `responseVariable` and
/// `overwriteBody` parameters.
#[async_trait]
pub trait ConnectorOperation: Send + Sync {
    /// Run the operation; implementations store their output with
    /// [`MessageContext::set_response`] under `response_variable`.
    async fn execute(
        &self,
        ctx: &mut dyn MessageContext,
        response_variable: &str,
        overwrite_body: bool,
    ) -> ConnectorResult<()>;

    /// Read both mandatory parameters and dispatch to [`execute`](Self::execute).
    ///
    /// Failures are also reported on the message as error code and message.
    async fn connect(&self, ctx: &mut dyn MessageContext) -> ConnectorResult<()> {
        let result = async {
            let variable = get_parameter(&*ctx, constants::RESPONSE_VARIABLE, ParamType::String, false)?
                .and_then(ParamValue::into_string)
                .unwrap_or_default();
            let overwrite_body = get_parameter(&*ctx, constants::OVERWRITE_BODY, ParamType::Boolean, false)?
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            self.execute(&mut *ctx, &variable, overwrite_body).await
        }
        .await;

        if let Err(e) = &result {
            ctx.report_error(e.code(), &e.error_message());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ConnectorResponse, SimpleContext};
    use crate::error::ConnectorError;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ConnectorOperation for Echo {
        async fn execute(
            &self,
            ctx: &mut dyn MessageContext,
            response_variable: &str,
            overwrite_body: bool,
        ) -> ConnectorResult<()> {
            let response = ConnectorResponse::new(json!({"echo": ctx.parameter("message")}))
                .with_attribute("overwriteBody", overwrite_body);
            ctx.set_response(response_variable, response);
            Ok(())
        }
    }

    fn ctx() -> SimpleContext {
        SimpleContext::new()
            .with_parameter(constants::RESPONSE_VARIABLE, "\"result\"")
            .with_parameter(constants::OVERWRITE_BODY, "FALSE")
            .with_parameter("message", "hi")
    }

    #[tokio::test]
    async fn test_connect_dispatches_parsed_parameters() {
        let mut ctx = ctx();
        Echo.connect(&mut ctx).await.unwrap();

        let response = ctx.response("result").unwrap();
        assert_eq!(response.payload, json!({"echo": "hi"}));
        assert_eq!(response.attributes["overwriteBody"], json!(false));
        assert!(ctx.property(constants::PROPERTY_ERROR_CODE).is_none());
    }

    #[tokio::test]
    async fn test_missing_response_variable() {
        let mut ctx = ctx();
        ctx.remove_parameter(constants::RESPONSE_VARIABLE);

        let err = Echo.connect(&mut ctx).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
        assert_eq!(err.to_string(), "Parameter responseVariable is not provided");
        assert_eq!(ctx.property(constants::PROPERTY_ERROR_CODE).as_deref(), Some("701002"));
    }

    #[tokio::test]
    async fn test_overwrite_body_must_be_boolean() {
        let mut ctx = ctx();
        ctx.add_parameter(constants::OVERWRITE_BODY, "yes");

        let err = Echo.connect(&mut ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Parameter overwriteBody is not of type Boolean");
        assert!(ctx.response("result").is_none());
    }
}
