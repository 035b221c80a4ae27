//! HTML page templating.
//!
//! Pages under `<root>/src/browser/pages` carry placeholder tokens that are
//! replaced per request:
//!
//! ```text
//! {{TO}}              post-login target (`to` query, default /dashboard)
//! {{BASE}}            relative root of the page
//! {{CS_STATIC_BASE}}  base for static assets of this build
//! "{{OPTIONS}}"       single-quoted JSON of every option, at most once
//! ```
//!
//! Callers chain page-specific replacements on the returned string.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::level_filters::LevelFilter;

use crate::config::GatewayConfig;
use crate::http::paths::relative_root;
use crate::http::request::RequestContext;

const DEFAULT_TO: &str = "/dashboard";

/// Options embedded into every page.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOptions {
    pub base: String,
    pub cs_static_base: String,
    pub log_level: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Renders pages with the runtime configuration of this process.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    commit: String,
    root: PathBuf,
}

impl TemplateRenderer {
    pub fn new(commit: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            commit: commit.into(),
            root: root.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.build.commit.clone(), config.paths.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a page template without blocking the runtime.
    pub async fn load(&self, page: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.page_path(page)).await
    }

    pub fn page_path(&self, page: &str) -> PathBuf {
        self.root.join("src").join("browser").join("pages").join(page)
    }

    pub fn options(&self, ctx: &RequestContext, extra: Map<String, Value>) -> TemplateOptions {
        let base = relative_root(&ctx.path);
        let cs_static_base = format!("{}/static/{}{}", base, self.commit, self.root.display());
        TemplateOptions {
            base,
            cs_static_base,
            log_level: LevelFilter::current().to_string().to_lowercase(),
            extra,
        }
    }

    /// Substitute the common tokens in `content`.
    pub fn render(&self, ctx: &RequestContext, content: &str, extra: Map<String, Value>) -> String {
        let options = self.options(ctx, extra);
        let to = ctx.query_str("to").unwrap_or(DEFAULT_TO);

        content
            .replace("{{TO}}", &escape_html(to))
            .replace("{{BASE}}", &options.base)
            .replace("{{CS_STATIC_BASE}}", &options.cs_static_base)
            .replacen("\"{{OPTIONS}}\"", &embed_json(&options), 1)
    }
}

/// `'<json>'`, for replacing a quoted placeholder inside an inline script.
pub fn embed_json<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    format!("'{json}'")
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Uri};

    fn ctx(url: &str) -> RequestContext {
        let uri: Uri = url.parse().unwrap();
        RequestContext::new(&uri, &HeaderMap::new())
    }

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new("abc123", "/opt/gateway")
    }

    #[test]
    fn replaces_every_base_and_static_token() {
        let page = "<a href=\"{{BASE}}/x\"></a><a href=\"{{BASE}}/y\"></a><link href=\"{{CS_STATIC_BASE}}/a.css\">";
        let out = renderer().render(&ctx("/foo/bar"), page, Map::new());
        assert_eq!(
            out,
            "<a href=\"./../x\"></a><a href=\"./../y\"></a><link href=\"./../static/abc123/opt/gateway/a.css\">"
        );
    }

    #[test]
    fn to_defaults_to_dashboard() {
        assert_eq!(renderer().render(&ctx("/login"), "{{TO}}", Map::new()), "/dashboard");
        assert_eq!(renderer().render(&ctx("/login?to="), "{{TO}}", Map::new()), "/dashboard");
        assert_eq!(renderer().render(&ctx("/login?to=a&to=b"), "{{TO}}", Map::new()), "/dashboard");
        assert_eq!(renderer().render(&ctx("/login?to=%2Fvscode"), "{{TO}}", Map::new()), "/vscode");
    }

    #[test]
    fn options_replaced_once_with_extras() {
        let mut extra = Map::new();
        extra.insert("disableTelemetry".into(), Value::Bool(true));
        let page = "const a = \"{{OPTIONS}}\"; const b = \"{{OPTIONS}}\";";
        let out = renderer().render(&ctx("/"), page, extra);

        let options = renderer().options(&ctx("/"), Map::new());
        let expected_json = format!(
            "{{\"base\":\".\",\"csStaticBase\":\"./static/abc123/opt/gateway\",\"logLevel\":\"{}\",\"disableTelemetry\":true}}",
            options.log_level
        );
        assert_eq!(
            out,
            format!("const a = '{expected_json}'; const b = \"{{{{OPTIONS}}}}\";")
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let page = "{{BASE}} {{CS_STATIC_BASE}} \"{{OPTIONS}}\" {{TO}}";
        let first = renderer().render(&ctx("/a/b?to=%2Fx"), page, Map::new());
        let second = renderer().render(&ctx("/a/b?to=%2Fx"), page, Map::new());
        assert_eq!(first, second);
    }

    #[test]
    fn to_is_escaped() {
        let out = renderer().render(&ctx("/login?to=%22%3E%3Cscript%3E"), "{{TO}}", Map::new());
        assert_eq!(out, "&quot;&gt;&lt;script&gt;");
    }
}
