use std::env;

const LOG_STREAM_VAR: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

/// Correlation data of one invocation, passed to everything that logs or
/// responds on behalf of it.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    pub request_id: String,
    pub log_stream: String,
}

impl InvocationContext {
    pub fn new(request_id: &str, log_stream: &str) -> Self {
        InvocationContext {
            request_id: request_id.to_string(),
            log_stream: log_stream.to_string(),
        }
    }

    pub fn from_lambda(context: &lambda::Context) -> Self {
        let log_stream = env::var(LOG_STREAM_VAR).unwrap_or_else(|_| context.request_id.clone());
        InvocationContext::new(&context.request_id, &log_stream)
    }

    /// Context of a program run outside Lambda.
    pub fn local() -> Self {
        let request_id = uuid::Uuid::new_v4().to_string();
        InvocationContext::new(&request_id, "local")
    }
}
