// ABOUTME: Rendering adapters that serialize generated content into documents
// ABOUTME: Markdown and self-contained HTML; renderers read content and never alter it

use proposekit_core::{format_currency, ProposalContent, ProposalRecord, UpsellOption};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Markdown,
    Html,
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Markdown => write!(f, "markdown"),
            DocumentFormat::Html => write!(f, "html"),
        }
    }
}

/// Presentation metadata that is not part of the generated narrative
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderMeta {
    pub client_name: String,
    pub title: Option<String>,
    pub upsell_options: Vec<UpsellOption>,
}

impl RenderMeta {
    pub fn for_proposal(proposal: &ProposalRecord) -> Self {
        Self {
            client_name: proposal.details.client_name.clone(),
            title: Some(proposal.display_title().to_string()),
            upsell_options: proposal.details.upsell_options.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub format: DocumentFormat,
    pub mime_type: &'static str,
    pub body: String,
}

pub trait DocumentRenderer: Send + Sync {
    fn format(&self) -> DocumentFormat;
    fn render(&self, content: &ProposalContent, meta: &RenderMeta) -> Document;
}

/// Heading/body pairs in reading order; section numbers shift when out-of-scope is absent
fn sections(content: &ProposalContent) -> Vec<(String, SectionBody<'_>)> {
    let mut titled: Vec<(&str, SectionBody<'_>)> = vec![
        ("Contexto e Objetivo", SectionBody::Text(&content.context)),
        ("Escopo do Projeto", SectionBody::List(&content.scope)),
    ];
    if let Some(out_of_scope) = &content.out_of_scope {
        titled.push(("O que não está incluso", SectionBody::Text(out_of_scope)));
    }
    titled.extend([
        ("Operação e Comunicação", SectionBody::Text(&content.operation)),
        ("Investimento", SectionBody::Text(&content.investment)),
        (
            "Condições Comerciais",
            SectionBody::Text(&content.commercial_conditions),
        ),
        ("Prazo Estimado", SectionBody::Text(&content.timeline)),
        ("Próximos Passos", SectionBody::Text(&content.next_steps)),
    ]);

    titled
        .into_iter()
        .enumerate()
        .map(|(i, (title, body))| (format!("{}. {}", i + 1, title), body))
        .collect()
}

enum SectionBody<'a> {
    Text(&'a str),
    List(&'a [String]),
}

const FOOTER: &str = "Documento gerado automaticamente via ProposeKit";

pub struct MarkdownRenderer;

impl DocumentRenderer for MarkdownRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Markdown
    }

    fn render(&self, content: &ProposalContent, meta: &RenderMeta) -> Document {
        let mut out = String::new();
        out.push_str(&format!(
            "# {}\n\n",
            meta.title.as_deref().unwrap_or("Proposta Comercial")
        ));
        out.push_str(&format!("**Plano de Trabalho para {}**\n\n", meta.client_name));
        out.push_str(&content.introduction);
        out.push_str("\n\n");

        for (heading, body) in sections(content) {
            out.push_str(&format!("## {}\n\n", heading));
            match body {
                SectionBody::Text(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                SectionBody::List(items) => {
                    for item in items {
                        out.push_str(&format!("- {}\n", item));
                    }
                }
            }
            out.push('\n');
        }

        if !meta.upsell_options.is_empty() {
            out.push_str("## Opcionais\n\n");
            for option in &meta.upsell_options {
                out.push_str(&format!(
                    "- {}: + {}\n",
                    option.title,
                    format_currency(option.value)
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!("---\n\n_{}_\n", FOOTER));

        Document {
            format: DocumentFormat::Markdown,
            mime_type: "text/markdown",
            body: out,
        }
    }
}

pub struct HtmlRenderer;

impl DocumentRenderer for HtmlRenderer {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Html
    }

    fn render(&self, content: &ProposalContent, meta: &RenderMeta) -> Document {
        let title = html_escape(meta.title.as_deref().unwrap_or("Proposta Comercial"));
        let mut body = String::new();

        body.push_str(&format!(
            "<header><p class=\"label\">Proposta Comercial</p><h1>Plano de Trabalho para {}</h1></header>\n",
            html_escape(&meta.client_name)
        ));
        body.push_str(&format!(
            "<p class=\"intro\">{}</p>\n",
            html_escape(&content.introduction)
        ));

        for (heading, section) in sections(content) {
            body.push_str(&format!("<section>\n<h2>{}</h2>\n", html_escape(&heading)));
            match section {
                SectionBody::Text(text) => {
                    body.push_str(&format!("<p>{}</p>\n", html_escape(text)));
                }
                SectionBody::List(items) => {
                    body.push_str("<ul>\n");
                    for item in items {
                        body.push_str(&format!("<li>{}</li>\n", html_escape(item)));
                    }
                    body.push_str("</ul>\n");
                }
            }
            body.push_str("</section>\n");
        }

        if !meta.upsell_options.is_empty() {
            body.push_str("<section class=\"upsell\">\n<h2>Opcionais</h2>\n<ul>\n");
            for option in &meta.upsell_options {
                body.push_str(&format!(
                    "<li>{} <span class=\"value\">+ {}</span></li>\n",
                    html_escape(&option.title),
                    html_escape(&format_currency(option.value))
                ));
            }
            body.push_str("</ul>\n</section>\n");
        }

        body.push_str(&format!("<footer>{}</footer>", FOOTER));

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{}</title>
    <style>{}</style>
</head>
<body>
    <div class="container">
{}
    </div>
</body>
</html>"#,
            title, DEFAULT_CSS, body
        );

        Document {
            format: DocumentFormat::Html,
            mime_type: "text/html",
            body: html,
        }
    }
}

/// Renderer for a requested format
pub fn renderer_for(format: DocumentFormat) -> Box<dyn DocumentRenderer> {
    match format {
        DocumentFormat::Markdown => Box::new(MarkdownRenderer),
        DocumentFormat::Html => Box::new(HtmlRenderer),
    }
}

/// HTML escape helper
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const DEFAULT_CSS: &str = r#"
body { font-family: Georgia, 'Times New Roman', serif; color: #111; background: #fdfdfd; margin: 0; }
.container { max-width: 760px; margin: 0 auto; padding: 64px 24px; }
header .label { font-family: Helvetica, Arial, sans-serif; font-size: 10px; letter-spacing: 0.3em; text-transform: uppercase; opacity: 0.5; }
h1 { font-size: 32px; font-weight: normal; font-style: italic; }
h2 { font-size: 14px; font-family: Helvetica, Arial, sans-serif; text-transform: uppercase; letter-spacing: 0.15em; margin-top: 40px; }
p, li { font-size: 16px; line-height: 1.6; }
.upsell .value { font-family: Helvetica, Arial, sans-serif; font-weight: bold; }
footer { margin-top: 64px; font-size: 12px; opacity: 0.5; text-align: center; }
"#;
