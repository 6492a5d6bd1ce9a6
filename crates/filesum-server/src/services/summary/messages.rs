//! User-visible texts of the summarization flow.

use std::time::Duration;

use crate::config::{Settings, SummaryConfig};

pub const BUSY: &str = "⏳ 正在处理上一条请求，请稍候";

/// Follow-up window in whole minutes, rounded up
pub fn window_minutes(content_ttl: Duration) -> u64 {
    content_ttl.as_secs().div_ceil(60).max(1)
}

pub fn follow_up_hint(qa_prefix: &str, content_ttl: Duration) -> String {
    format!(
        "\n\n💡 您可以在{}分钟内发送「{}xxx」来询问文件相关问题",
        window_minutes(content_ttl),
        qa_prefix
    )
}

pub fn question_usage(qa_prefix: &str) -> String {
    format!("请在「{}」后面加上您的问题，例如：{}这份文件的结论是什么？", qa_prefix, qa_prefix)
}

pub fn help_text(settings: &Settings) -> String {
    let summary: &SummaryConfig = &settings.summary;
    let mut help = String::from("📄 文件总结插件使用说明：\n");
    help.push_str("1. 发送文件后，单聊会自动总结\n");
    if summary.group {
        help.push_str(&format!("2. 群聊需要发送「{}」触发总结\n", summary.trigger_keyword));
    } else {
        help.push_str("2. 群聊中文件总结功能已关闭\n");
    }
    help.push_str(&format!(
        "3. 总结完成后{}分钟内可发送「{}xxx」追问文件内容\n",
        window_minutes(settings.cache.content_ttl()),
        summary.qa_prefix
    ));
    help.push_str(&format!(
        "\n支持格式：PDF、Word、Excel、PPT、TXT、Markdown、HTML、CSV（文件不超过{}KB）",
        summary.max_file_size_kb
    ));
    help
}
