//! Both summarize actions against mock HTTP servers and a scripted tab

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

use tabbrief::api::GroqClient;
use tabbrief::browser::{TabScripting, TabSource};
use tabbrief::config::{Credentials, MemorySettingsStore, SettingKey, Settings, SettingsStore};
use tabbrief::error::Result;
use tabbrief::popup::{Action, Outcome, PopupController};
use tabbrief::transcript::HttpCaptionDownloader;

const ARTICLE: &str = "The borrow checker enforces aliasing rules at compile time, \
                       which removes a whole class of memory bugs.";

/// Answers the text script with `text` and the caption script with `captions`
struct ScriptedTabs {
    text: Value,
    captions: Value,
}

struct ScriptedTab {
    text: Value,
    captions: Value,
}

#[async_trait]
impl TabScripting for ScriptedTab {
    async fn execute(&self, expression: &str) -> Result<Value> {
        if expression.contains("innerText") {
            Ok(self.text.clone())
        } else {
            Ok(self.captions.clone())
        }
    }
}

#[async_trait]
impl TabSource for ScriptedTabs {
    async fn active_tab(&self) -> Result<Box<dyn TabScripting>> {
        Ok(Box::new(ScriptedTab {
            text: self.text.clone(),
            captions: self.captions.clone(),
        }))
    }
}

fn credentials(key: &str, model: Option<&str>) -> Credentials {
    let mut settings = Settings::new();
    settings.insert(SettingKey::ApiKey, key.to_string());
    if let Some(model) = model {
        settings.insert(SettingKey::Model, model.to_string());
    }
    let store = MemorySettingsStore::default();
    store.set(settings).unwrap();
    Credentials::load(&store).unwrap()
}

async fn mount_completion(server: &MockServer, status: u16, body: Value) {
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn page_summary_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/openai/v1/chat/completions"))
        .and(matchers::header("Authorization", "Bearer gsk_test"))
        .and(matchers::body_partial_json(json!({
            "model": "llama-3.1-8b-instant",
            "messages": [{
                "role": "user",
                "content": format!("Summarize the following webpage content:\n\n{}", ARTICLE)
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "Aliasing rules, checked early." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tabs = ScriptedTabs {
        text: json!(ARTICLE),
        captions: Value::Null,
    };
    let captions = HttpCaptionDownloader::new(reqwest::Client::new());
    let groq = GroqClient::with_base_url(&format!("{}/openai/v1", server.uri()));
    let controller = PopupController::new(
        credentials("gsk_test", Some("llama-3.1-8b-instant")),
        &tabs,
        &captions,
        &groq,
    );

    let outcome = controller.run(Action::SummarizePage).await;
    assert_eq!(outcome.render(), "Aliasing rules, checked early.");
}

#[tokio::test]
async fn transcript_summary_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/timedtext"))
        .and(matchers::query_param("lang", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<transcript>\
               <text start=\"0\" dur=\"2\">Today we&#39;re looking at ownership</text>\
               <text start=\"2\" dur=\"3\">and how moves transfer it between bindings.</text>\
             </transcript>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_completion(
        &server,
        200,
        json!({ "choices": [{ "message": { "content": "Ownership explained." } }] }),
    )
    .await;

    let tabs = ScriptedTabs {
        text: Value::Null,
        captions: json!({
            "status": "tracks",
            "tracks": [
                { "baseUrl": format!("{}/api/timedtext?lang=de", server.uri()), "languageCode": "de" },
                { "baseUrl": format!("{}/api/timedtext?lang=en", server.uri()), "languageCode": "en" }
            ]
        }),
    };
    let captions = HttpCaptionDownloader::new(reqwest::Client::new());
    let groq = GroqClient::with_base_url(&format!("{}/openai/v1", server.uri()));
    let controller = PopupController::new(credentials("gsk_test", None), &tabs, &captions, &groq);

    let outcome = controller.run(Action::SummarizeTranscript).await;

    let rendered = outcome.render();
    assert!(rendered.starts_with(
        "Transcript (first 500 chars):\nToday we're looking at ownership and how moves"
    ));
    assert!(rendered.ends_with("...\n\n✨ Summary:\nOwnership explained."));
}

#[tokio::test]
async fn unauthorized_key_is_marked() {
    let server = MockServer::start().await;
    mount_completion(&server, 401, json!({ "error": { "message": "Invalid API Key" } })).await;

    let tabs = ScriptedTabs {
        text: json!(ARTICLE),
        captions: Value::Null,
    };
    let captions = HttpCaptionDownloader::new(reqwest::Client::new());
    let groq = GroqClient::with_base_url(&format!("{}/openai/v1", server.uri()));
    let controller = PopupController::new(credentials("gsk_revoked", None), &tabs, &captions, &groq);

    let outcome = controller.run(Action::SummarizePage).await;

    assert!(matches!(outcome, Outcome::Failed(_)));
    assert_eq!(outcome.render(), "XGroq API error: 401 Unauthorized");
}

#[tokio::test]
async fn empty_track_list_never_downloads() {
    let server = MockServer::start().await;
    Mock::given(matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let tabs = ScriptedTabs {
        text: Value::Null,
        captions: json!({ "status": "emptyTrackList" }),
    };
    let captions = HttpCaptionDownloader::new(reqwest::Client::new());
    let groq = GroqClient::with_base_url(&format!("{}/openai/v1", server.uri()));
    let controller = PopupController::new(credentials("gsk_test", None), &tabs, &captions, &groq);

    let outcome = controller.run(Action::SummarizeTranscript).await;
    assert_eq!(outcome.render(), "XNo captions found.");
}
