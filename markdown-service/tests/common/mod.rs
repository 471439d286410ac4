use markdown_service::config::MarkdownConfig;
use markdown_service::services::{Converter, DocumentConverter};
use markdown_service::startup::Application;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(customize: impl FnOnce(&mut MarkdownConfig)) -> Self {
        Self::spawn_with_converter(Arc::new(DocumentConverter::new()), customize).await
    }

    pub async fn spawn_with_converter(
        converter: Arc<dyn Converter>,
        customize: impl FnOnce(&mut MarkdownConfig),
    ) -> Self {
        let mut config = MarkdownConfig::load().expect("Failed to load configuration");
        config.common.port = 0; // Random port for testing
        customize(&mut config);

        let app = Application::build_with_converter(config, converter)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the root endpoint
        let client = reqwest::Client::new();
        let root_url = format!("{}/", address);
        for _ in 0..50 {
            if client.get(&root_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }

    /// Build a one-file multipart form the way browser clients submit it.
    pub fn file_form(content: Vec<u8>, filename: &str, mime: &str) -> reqwest::multipart::Form {
        reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(content)
                .file_name(filename.to_string())
                .mime_str(mime)
                .unwrap(),
        )
    }
}
