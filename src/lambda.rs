use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::encodings::Body;
use axum::http::HeaderValue;
use axum::http::header::CONTENT_TYPE;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use jluszcz_rust_utils::lambda;
use lambda_runtime::{LambdaEvent, service_fn};
use metasync::verify::SIGNATURE_HEADER;
use metasync::{APP_NAME, Config, ShopifyClient, handle_customer_webhook};
use std::error::Error;
use tokio::sync::OnceCell;

type LambdaError = Box<dyn Error + Send + Sync + 'static>;

static STATE: OnceCell<(Config, ShopifyClient)> = OnceCell::const_new();

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    let func = service_fn(function);
    lambda_runtime::run(func).await?;
    Ok(())
}

async fn state() -> Result<&'static (Config, ShopifyClient), LambdaError> {
    let state = STATE
        .get_or_try_init(|| async {
            let config = Config::from_env()?;
            let client = ShopifyClient::new(&config)?;
            Ok::<_, anyhow::Error>((config, client))
        })
        .await?;

    Ok(state)
}

async fn function(
    event: LambdaEvent<ApiGatewayProxyRequest>,
) -> Result<ApiGatewayProxyResponse, LambdaError> {
    lambda::init(APP_NAME, module_path!(), false).await?;

    let (config, client) = state().await?;
    let request = event.payload;

    let body = match request.body {
        Some(body) if request.is_base64_encoded => BASE64_STANDARD.decode(body)?,
        Some(body) => body.into_bytes(),
        None => Vec::new(),
    };
    let signature = request
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let response =
        handle_customer_webhook(client, config.webhook_secret.as_deref(), &body, signature).await;

    let mut proxy_response = ApiGatewayProxyResponse {
        status_code: i64::from(response.status_code()),
        body: Some(Body::Text(response.to_json().to_string())),
        ..Default::default()
    };
    proxy_response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(proxy_response)
}
