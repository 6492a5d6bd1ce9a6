//! End-to-end conversations against a stubbed chat completions endpoint.

use filesum_server::config::Settings;
use filesum_server::models::{EventAction, InboundEvent, ReplyKind};
use filesum_server::services::{LlmService, ManualClock, SummaryController};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str) -> Settings {
    Settings::from_toml_str(&format!(
        r#"
[llm]
api_key = "sk-test"
base_url = "{}"
model = "test-model"

[cache]
file_cache_seconds = 60
content_cache_seconds = 300
"#,
        base_url
    ))
    .unwrap()
}

fn flow(server: &MockServer) -> (Arc<ManualClock>, SummaryController) {
    let settings = settings(&server.uri());
    let llm = Arc::new(LlmService::new(settings.llm.clone()).unwrap());
    let clock = Arc::new(ManualClock::new());
    let controller = SummaryController::new(&settings, llm, clock.clone());
    (clock, controller)
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

fn write_pdf(path: &Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn text_file(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn direct_chat_summary_then_follow_up_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("文件总结助手"))
        .respond_with(completion("这是一份季度计划"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("文件问答助手"))
        .and(body_string_contains("MARKER_Q3_PLAN"))
        .respond_with(completion("关键内容是第三季度计划"))
        .expect(1)
        .mount(&server)
        .await;

    let (_, controller) = flow(&server);
    let dir = TempDir::new().unwrap();
    let file = text_file(&dir, "plan.txt", "MARKER_Q3_PLAN 第三季度计划");

    let summary = controller
        .handle(&InboundEvent::file("wxid_abc@chatroom", "wxid_user", false, &file))
        .await;
    assert_eq!(summary.action, EventAction::BreakPass);
    let reply = summary.reply.unwrap();
    assert_eq!(reply.kind, ReplyKind::Text);
    assert!(reply.content.starts_with("这是一份季度计划"));

    let key = InboundEvent::text("wxid_abc@chatroom", "wxid_user", false, "").key();
    assert!(!controller.store().pending.contains(&key));
    assert!(!file.exists());

    let answer = controller
        .handle(&InboundEvent::text(
            "wxid_abc@chatroom",
            "wxid_user",
            false,
            "问：关键内容是什么？",
        ))
        .await;
    assert_eq!(answer.reply.unwrap().content, "关键内容是第三季度计划");
}

#[tokio::test]
async fn group_chat_declines_unrelated_text_then_triggers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("GroupPdfMarker"))
        .respond_with(completion("PDF 摘要"))
        .expect(1)
        .mount(&server)
        .await;

    let (_, controller) = flow(&server);
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("report.pdf");
    write_pdf(&pdf, "GroupPdfMarker");

    let queued = controller
        .handle(&InboundEvent::file("room1", "bob", true, &pdf))
        .await;
    assert_eq!(queued.action, EventAction::Continue);
    assert!(queued.reply.is_none());

    let chatter = controller
        .handle(&InboundEvent::text("room1", "bob", true, "今天天气怎么样"))
        .await;
    assert_eq!(chatter.action, EventAction::Continue);
    assert!(chatter.reply.is_none());

    // Another member saying the keyword has nothing pending under their key
    let other = controller
        .handle(&InboundEvent::text("room1", "carol", true, "总结"))
        .await;
    assert_eq!(other.action, EventAction::Continue);

    let triggered = controller
        .handle(&InboundEvent::text("room1", "bob", true, "总结"))
        .await;
    assert_eq!(triggered.action, EventAction::BreakPass);
    assert!(triggered.reply.unwrap().content.starts_with("PDF 摘要"));
}

#[tokio::test]
async fn group_members_with_shared_id_prefix_stay_separate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("AliceNotes"))
        .respond_with(completion("Alice 摘要"))
        .expect(1)
        .mount(&server)
        .await;

    let (_, controller) = flow(&server);
    let dir = TempDir::new().unwrap();
    let notes = text_file(&dir, "notes.txt", "AliceNotes");

    let queued = controller
        .handle(&InboundEvent::file("12345@chatroom", "wxid_alice", true, &notes))
        .await;
    assert_eq!(queued.action, EventAction::Continue);

    // Same "wxid" prefix, different member: nothing pending under this key
    let bob = controller
        .handle(&InboundEvent::text("12345@chatroom", "wxid_bob", true, "总结"))
        .await;
    assert_eq!(bob.action, EventAction::Continue);
    assert!(bob.reply.is_none());

    let alice = controller
        .handle(&InboundEvent::text("12345@chatroom", "wxid_alice", true, "总结"))
        .await;
    assert_eq!(alice.action, EventAction::BreakPass);
    assert!(alice.reply.unwrap().content.starts_with("Alice 摘要"));

    // Follow-ups are scoped the same way
    let stranger = controller
        .handle(&InboundEvent::text("12345@chatroom", "wxid_bob", true, "问：说了什么？"))
        .await;
    assert_eq!(stranger.reply.unwrap().content, "文件内容已过期，请重新发送文件后再提问");
}

#[tokio::test]
async fn follow_up_after_content_ttl_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("文件总结助手"))
        .respond_with(completion("摘要"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("文件问答助手"))
        .respond_with(completion("不应被调用"))
        .expect(0)
        .mount(&server)
        .await;

    let (clock, controller) = flow(&server);
    let dir = TempDir::new().unwrap();
    let file = text_file(&dir, "notes.txt", "content");

    controller
        .handle(&InboundEvent::file("chat", "alice", false, &file))
        .await;
    clock.advance(Duration::from_secs(301));

    let outcome = controller
        .handle(&InboundEvent::text("chat", "alice", false, "问：还记得吗？"))
        .await;
    let reply = outcome.reply.unwrap();
    assert_eq!(reply.kind, ReplyKind::Error);
    assert_eq!(reply.content, "文件内容已过期，请重新发送文件后再提问");
}

#[tokio::test]
async fn gateway_500_gives_api_error_and_accepts_new_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("first-upload"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("second-upload"))
        .respond_with(completion("第二份摘要"))
        .expect(1)
        .mount(&server)
        .await;

    let (_, controller) = flow(&server);
    let dir = TempDir::new().unwrap();

    let first = text_file(&dir, "a.txt", "first-upload");
    let failed = controller
        .handle(&InboundEvent::file("chat", "alice", false, &first))
        .await;
    let reply = failed.reply.unwrap();
    assert_eq!(reply.kind, ReplyKind::Error);
    assert_eq!(reply.content, "调用API失败，请稍后重试");

    // Nothing to ask about after a failed summary
    let question = controller
        .handle(&InboundEvent::text("chat", "alice", false, "问：内容？"))
        .await;
    assert_eq!(
        question.reply.unwrap().content,
        "文件内容已过期，请重新发送文件后再提问"
    );

    let second = text_file(&dir, "b.txt", "second-upload");
    let ok = controller
        .handle(&InboundEvent::file("chat", "alice", false, &second))
        .await;
    assert!(ok.reply.unwrap().content.starts_with("第二份摘要"));
}

#[tokio::test]
async fn oversize_file_rejected_without_gateway_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("不应被调用"))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = settings(&server.uri());
    settings.summary.max_file_size_kb = 1;
    let llm = Arc::new(LlmService::new(settings.llm.clone()).unwrap());
    let controller = SummaryController::new(&settings, llm, Arc::new(ManualClock::new()));

    let dir = TempDir::new().unwrap();
    let big = text_file(&dir, "big.txt", &"a".repeat(4096));
    let outcome = controller
        .handle(&InboundEvent::file("chat", "alice", false, &big))
        .await;
    assert_eq!(outcome.reply.unwrap().content, "文件太大，无法处理");
}
