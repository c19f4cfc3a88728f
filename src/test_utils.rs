pub mod test_helpers {
    use crate::config::Settings;
    use crate::mcp::registry::ToolOutput;
    use crate::providers::{Provider, ToolRegistrar};
    use crate::AppState;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// In-process provider with fixed credentials validity
    ///
    /// Registers `echo` (returns its `text` argument) and `fail` (always errors).
    pub struct StaticProvider {
        name: String,
        required_role: Option<String>,
        valid: bool,
        loads: AtomicUsize,
    }

    impl StaticProvider {
        pub fn new(name: &str, valid: bool) -> Self {
            Self {
                name: name.to_string(),
                required_role: None,
                valid,
                loads: AtomicUsize::new(0),
            }
        }

        pub fn with_required_role(mut self, role: &str) -> Self {
            self.required_role = Some(role.to_string());
            self
        }

        /// How often `load_credentials` ran
        pub fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for StaticProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn required_role(&self) -> Option<&str> {
            self.required_role.as_deref()
        }

        async fn load_credentials(&self) -> bool {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.valid
        }

        fn register_tools(&self, registrar: &mut ToolRegistrar<'_>) {
            registrar.register(
                "echo",
                "Echo the text argument",
                json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
                |arguments| async move {
                    let text = arguments
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    Ok(ToolOutput::Text(text))
                },
            );

            registrar.register(
                "fail",
                "Always fails",
                json!({ "type": "object" }),
                |_| async move { Err(anyhow::anyhow!("upstream unavailable")) },
            );
        }
    }

    /// Default settings with a short keep-alive for stream tests
    pub fn test_settings() -> Settings {
        Settings {
            sse_keep_alive: Duration::from_millis(200),
            ..Settings::default()
        }
    }

    /// State with no providers registered
    pub fn test_state() -> AppState {
        match AppState::from_settings(test_settings()) {
            Ok(state) => state,
            Err(e) => panic!("Test settings rejected: {}", e),
        }
    }

    /// State with an initialized `demo` provider exposing `demo_echo` and `demo_fail`
    pub async fn demo_state() -> AppState {
        let state = test_state();
        state
            .providers
            .register(Arc::new(StaticProvider::new("demo", true)));
        state.providers.initialize_all(None).await;
        state
    }
}
