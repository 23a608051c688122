// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::ThreadRef;
use scraper::{Html, Selector};
use url::Url;

/// 论坛页面解析特质
///
/// HTML结构解析属于编排层之外的协作方；编排器只依赖这三个钩子。
pub trait ForumParser: Send + Sync {
    /// 从列表页源码解析出按页面顺序排列的帖子引用
    fn thread_list(&self, html: &str, base_url: &str) -> Vec<ThreadRef>;

    /// 从帖子页源码解析出楼层文本
    fn posts(&self, html: &str) -> Vec<String>;

    /// 当前页之后是否还有下一页
    fn has_next_page(&self, html: &str) -> bool;
}

/// 贴吧页面解析器
pub struct TiebaParser;

const NEXT_PAGE_LABELS: [&str; 3] = ["下一页", "下一页 >", "下一页›"];

impl ForumParser for TiebaParser {
    fn thread_list(&self, html: &str, base_url: &str) -> Vec<ThreadRef> {
        let document = Html::parse_document(html);
        let selector = Selector::parse(r#"a[href^="/p/"]"#).unwrap();

        let mut threads = Vec::new();
        for element in document.select(&selector) {
            let href = match element.value().attr("href") {
                Some(h) => h,
                None => continue,
            };
            let title = element
                .value()
                .attr("title")
                .map(str::to_string)
                .unwrap_or_else(|| element.text().collect::<String>().trim().to_string());
            if title.is_empty() {
                continue;
            }
            let url = match Url::parse(base_url).and_then(|base| base.join(href)) {
                Ok(url) => url.to_string(),
                Err(_) => format!("{}{}", base_url, href),
            };
            threads.push(ThreadRef { title, url });
        }
        threads
    }

    fn posts(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("div.d_post_content").unwrap();

        document
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .collect()
    }

    fn has_next_page(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        let selector = Selector::parse("a").unwrap();

        document.select(&selector).any(|el| {
            let text = el.text().collect::<String>();
            NEXT_PAGE_LABELS.contains(&text.trim())
        })
    }
}
