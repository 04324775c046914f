//! HTML rendering of stored assets.
//!
//! An [`AssetRecord`] is rendered as an `<img>` inside a fixed frame, with
//! the record's [`ObjectFit`](crate::types::ObjectFit) applied as the CSS
//! `object-fit` property. A missing asset renders the "No image set"
//! placeholder the dashboard shows in its admin view.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating,
//! which escapes every interpolated value.

use crate::types::AssetRecord;
use maud::{DOCTYPE, Markup, html};

const CSS: &str = "\
body { font-family: system-ui, sans-serif; margin: 2rem; background: #111; color: #eee; }
.asset-frame { width: 320px; height: 320px; border: 1px solid #444; overflow: hidden; }
.asset-frame img { width: 100%; height: 100%; display: block; }
.asset-empty { display: flex; align-items: center; justify-content: center; color: #888; }
dl { display: grid; grid-template-columns: max-content 1fr; gap: 0.25rem 1rem; }
dt { color: #888; }
";

/// Renders an asset inside its frame, or the empty placeholder.
pub fn render_asset(record: Option<&AssetRecord>, alt: &str) -> Markup {
    html! {
        @match record {
            Some(record) => {
                div.asset-frame {
                    img src=(record.url) alt=(alt)
                        style={ "object-fit: " (record.display.object_fit.as_css()) ";" };
                }
            }
            None => {
                div.asset-frame.asset-empty { "No image set" }
            }
        }
    }
}

/// Renders a standalone page previewing one asset and its stored settings.
pub fn render_preview_page(record: Option<&AssetRecord>, title: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body {
                h1 { (title) }
                (render_asset(record, title))
                @if let Some(record) = record {
                    dl {
                        dt { "Bucket" } dd { (record.bucket) }
                        dt { "Key" } dd { (record.key) }
                        dt { "Fit" } dd { (record.display.object_fit) }
                        dt { "URL" } dd { a href=(record.url) { (record.url) } }
                    }
                }
            }
        }
    }
}
