//! Static parser catalog.
//!
//! Fallback copy of the control-plane catalog, used when dynamic loading is
//! disabled or the first fetch fails. Kept in sync with the remote
//! `/parsers` endpoint by hand.

use std::sync::Arc;

use once_cell::sync::Lazy;

/// One remote scraping capability.
///
/// Constructed either from the static table below or from a control-plane
/// row during a registry refresh; downstream code never branches on which.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserDescriptor {
    /// Unique slug used as the `engine` value in tool calls.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grouping category (FreeAI, SE, Social, ...).
    pub category: String,
    pub description: String,
    /// Opaque engine identifier passed to the execution backend.
    pub remote_name: String,
}

fn parser(id: &str, name: &str, category: &str, description: &str, remote_name: &str) -> ParserDescriptor {
    ParserDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        remote_name: remote_name.to_string(),
    }
}

static PARSERS: Lazy<Arc<Vec<ParserDescriptor>>> = Lazy::new(|| {
    Arc::new(vec![
        // FreeAI - AI chat and research
        parser(
            "perplexity",
            "Perplexity AI",
            "FreeAI",
            "Research with Perplexity AI - comprehensive answers with sources",
            "FreeAI::Perplexity",
        ),
        parser(
            "googleai",
            "Google AI Mode",
            "FreeAI",
            "Google AI-powered search with structured sources",
            "FreeAI::GoogleAI",
        ),
        parser(
            "chatgpt",
            "ChatGPT",
            "FreeAI",
            "ChatGPT conversational AI with sources and images",
            "FreeAI::ChatGPT",
        ),
        parser(
            "kimi",
            "Kimi AI",
            "FreeAI",
            "Kimi AI for translations, explanations, summaries",
            "FreeAI::Kimi",
        ),
        parser(
            "deepai",
            "Deep AI",
            "FreeAI",
            "Deep AI with poems, stories, math, and code assistance",
            "FreeAI::DeepAI",
        ),
        parser(
            "copilot",
            "Microsoft Copilot",
            "FreeAI",
            "Microsoft Copilot for code and technical documentation",
            "FreeAI::Copilot",
        ),
        // Net
        parser(
            "http",
            "HTTP Fetcher",
            "Net",
            "Fetch raw content from publicly accessible URLs",
            "Net::HTTP",
        ),
        // YouTube
        parser(
            "youtube_video",
            "YouTube Video",
            "YouTube",
            "Parse YouTube video metadata, subtitles, comments",
            "SE::YouTube::Video",
        ),
        parser(
            "youtube_search",
            "YouTube Search",
            "YouTube",
            "Search YouTube videos by keywords",
            "SE::YouTube",
        ),
        parser(
            "youtube_suggest",
            "YouTube Suggestions",
            "YouTube",
            "Get search suggestions/autocomplete for keywords",
            "SE::YouTube::Suggest",
        ),
        parser(
            "youtube_channel_videos",
            "YouTube Channel Videos",
            "YouTube",
            "Collect all videos from a YouTube channel",
            "JS::Example::Youtube::Channel::Videos",
        ),
        parser(
            "youtube_channel_about",
            "YouTube Channel About",
            "YouTube",
            "Parse channel information from About page",
            "Net::HTTP",
        ),
        parser(
            "youtube_comments",
            "YouTube Comments",
            "YouTube",
            "Parse comments from YouTube videos",
            "JS::Example::Youtube::Comments",
        ),
        // Social media
        parser(
            "telegram_group",
            "Telegram Group",
            "Social",
            "Parse messages and members from public Telegram groups",
            "Telegram::GroupScraper",
        ),
        parser(
            "reddit_posts",
            "Reddit Posts",
            "Social",
            "Parse posts from Reddit by keywords or communities",
            "Reddit::Posts",
        ),
        parser(
            "reddit_post_info",
            "Reddit Post Info",
            "Social",
            "Parse detailed information about a specific Reddit post",
            "Reddit::PostInfo",
        ),
        parser(
            "reddit_comments",
            "Reddit Comments",
            "Social",
            "Parse comments from Reddit by keyword or community",
            "Reddit::Comments",
        ),
        parser(
            "instagram_profile",
            "Instagram Profile",
            "Social",
            "Parse Instagram profile data: posts, followers, bio",
            "Social::Instagram::Profile",
        ),
        parser(
            "instagram_post",
            "Instagram Post",
            "Social",
            "Parse Instagram post data: likes, comments, caption",
            "Social::Instagram::Post",
        ),
        parser(
            "instagram_tag",
            "Instagram Tag",
            "Social",
            "Parse posts by hashtag from Instagram",
            "Social::Instagram::Tag",
        ),
        parser(
            "instagram_geo",
            "Instagram Geo",
            "Social",
            "Parse Instagram posts by location/geotag",
            "Social::Instagram::Geo",
        ),
        parser(
            "instagram_search",
            "Instagram Search",
            "Social",
            "Search Instagram: profiles, hashtags, locations",
            "Social::Instagram::Search",
        ),
        parser(
            "tiktok_profile",
            "TikTok Profile",
            "Social",
            "Parse TikTok profile data: videos, followers, bio",
            "Social::TikTok::Profile",
        ),
        // Translation
        parser(
            "google_translate",
            "Google Translate",
            "Translation",
            "Fast translation with transliteration and alternatives",
            "SE::Google::Translate",
        ),
        parser(
            "deepl_translate",
            "DeepL Translator",
            "Translation",
            "High-quality translation via DeepL",
            "DeepL::Translator",
        ),
        parser(
            "bing_translate",
            "Bing Translator",
            "Translation",
            "Reliable translation via Bing Translator",
            "SE::Bing::Translator",
        ),
        parser(
            "yandex_translate",
            "Yandex Translate",
            "Translation",
            "Fast translation via Yandex with captcha bypass",
            "SE::Yandex::Translate",
        ),
        // Search engines
        parser(
            "google_search",
            "Google Search",
            "SE",
            "Google web search results with all operators",
            "SE::Google",
        ),
        parser(
            "yandex_search",
            "Yandex Search",
            "SE",
            "Yandex search with captcha bypass",
            "SE::Yandex",
        ),
        parser(
            "bing_search",
            "Bing Search",
            "SE",
            "Bing search results up to 200 pages",
            "SE::Bing",
        ),
        parser(
            "duckduckgo_search",
            "DuckDuckGo Search",
            "SE",
            "Privacy-focused DuckDuckGo search",
            "SE::DuckDuckGo",
        ),
        parser(
            "baidu_search",
            "Baidu Search",
            "SE",
            "Chinese search engine Baidu",
            "SE::Baidu",
        ),
        parser(
            "yahoo_search",
            "Yahoo Search",
            "SE",
            "Yahoo search results",
            "SE::Yahoo",
        ),
        parser(
            "rambler_search",
            "Rambler Search",
            "SE",
            "Russian search engine Rambler",
            "SE::Rambler",
        ),
        parser(
            "you_search",
            "You.com Search",
            "SE",
            "You.com AI-powered search",
            "SE::You",
        ),
        // Content extraction
        parser(
            "article_extractor",
            "Article Extractor",
            "Content",
            "Extract articles using Mozilla Readability",
            "HTML::ArticleExtractor",
        ),
        parser(
            "text_extractor",
            "Text Extractor",
            "Content",
            "Parse text blocks from web pages",
            "HTML::TextExtractor",
        ),
        parser(
            "link_extractor",
            "Link Extractor",
            "Content",
            "Extract all links from HTML pages",
            "HTML::LinkExtractor",
        ),
        // Analytics
        parser(
            "google_trends",
            "Google Trends",
            "Analytics",
            "Parse trending keywords from Google Trends",
            "SE::Google::Trends",
        ),
        // Visual
        parser(
            "pinterest_search",
            "Pinterest Search",
            "Visual",
            "Parse Pinterest search results: images, titles",
            "SE::Pinterest",
        ),
    ])
});

/// The full static catalog as a shared snapshot.
pub fn static_parsers() -> Arc<Vec<ParserDescriptor>> {
    Arc::clone(&PARSERS)
}

pub fn get_parser_by_id(id: &str) -> Option<&'static ParserDescriptor> {
    PARSERS.iter().find(|p| p.id == id)
}

pub fn get_parser_by_remote_name(name: &str) -> Option<&'static ParserDescriptor> {
    PARSERS.iter().find(|p| p.remote_name == name)
}

pub fn get_parsers_by_category(category: &str) -> Vec<&'static ParserDescriptor> {
    PARSERS.iter().filter(|p| p.category == category).collect()
}

/// Category values in first-seen order, deduplicated.
pub fn all_categories() -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for p in PARSERS.iter() {
        if !categories.contains(&p.category) {
            categories.push(p.category.clone());
        }
    }
    categories
}
