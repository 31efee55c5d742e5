//! Console progress rendering of crawl events

use crate::crawler::{CrawlEvent, EventKind, EventSink};
use tracing::warn;

/// Line format of the console sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressFormat {
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

/// Prints crawl events to stdout
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    format: ProgressFormat,
}

impl ConsoleSink {
    pub fn new(format: ProgressFormat) -> Self {
        Self { format }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: &CrawlEvent) {
        match self.format {
            ProgressFormat::Human => {
                println!("{}", render_line(event));
            }
            ProgressFormat::Json => match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize {} event: {}", event.event, e),
            },
        }
    }
}

/// Renders an event as a human-readable line
pub fn render_line(event: &CrawlEvent) -> String {
    let url = event.url.as_deref().unwrap_or("-");
    let detail_url = event.detail_url.as_deref().unwrap_or(url);
    let message = event.message.as_deref().unwrap_or("");

    let line = match event.event {
        EventKind::SiteStart => format!("站点: {}", url),
        EventKind::Page => format!(
            "页面: {} | 链接={} | 入队={}",
            url,
            event.found.unwrap_or(0),
            event.queued.unwrap_or(0)
        ),
        EventKind::Item => {
            let year = event
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string());
            format!(
                "条目: {} ({}) {} -> {}",
                event.title.as_deref().unwrap_or("-"),
                year,
                event.kind.as_deref().unwrap_or("-"),
                detail_url
            )
        }
        EventKind::DetailSaved => format!("保存详情: {}", detail_url),
        EventKind::NotDetail => format!("非详情页: {}", detail_url),
        EventKind::Warn => format!("警告: {} {}", url, message),
        EventKind::Error => format!("错误: {} {}", detail_url, message),
        EventKind::SiteDone => format!("完成: {} 条目={}", url, event.count.unwrap_or(0)),
        EventKind::CategoryStart => format!(
            "分类开始: {} {}",
            event.section.as_deref().unwrap_or("-"),
            url
        ),
        EventKind::CategoryDone => format!(
            "分类完成: {} 条目={}",
            event.section.as_deref().unwrap_or("-"),
            event.count.unwrap_or(0)
        ),
    };
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_line() {
        let event = CrawlEvent::new(EventKind::Item)
            .with_detail_url("http://www.dydytt.net/html/gndy/dyzz/20230401/1.html")
            .with_title("流浪地球2")
            .with_year(Some(2023))
            .with_kind("movie_cn");
        assert_eq!(
            render_line(&event),
            "条目: 流浪地球2 (2023) movie_cn -> http://www.dydytt.net/html/gndy/dyzz/20230401/1.html"
        );
    }

    #[test]
    fn test_page_line() {
        let event = CrawlEvent::new(EventKind::Page)
            .with_url("http://www.dydytt.net/html/gndy/dyzz/index.html")
            .with_found(30)
            .with_queued(25);
        assert_eq!(
            render_line(&event),
            "页面: http://www.dydytt.net/html/gndy/dyzz/index.html | 链接=30 | 入队=25"
        );
    }

    #[test]
    fn test_item_without_year() {
        let event = CrawlEvent::new(EventKind::Item)
            .with_detail_url("http://a/1.html")
            .with_title("某片")
            .with_year(None)
            .with_kind("movie");
        assert_eq!(render_line(&event), "条目: 某片 (?) movie -> http://a/1.html");
    }

    #[test]
    fn test_error_line_uses_detail_url() {
        let event = CrawlEvent::new(EventKind::Error)
            .with_detail_url("http://a/2.html")
            .with_message("HTTP 404");
        assert_eq!(render_line(&event), "错误: http://a/2.html HTTP 404");
    }
}
