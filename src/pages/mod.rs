//! HTML pages served to scanners.
//!
//! Deliberately minimal: one product detail page, one not-found page, and a
//! plain-text welcome message. Every catalog value is HTML-escaped.

use std::fmt::Write as _;

use serde_json::Value;

use crate::catalog::{IDENTIFIER_FIELD, Product};
use crate::http::{Response, StatusCode};

/// Body of `GET /`.
pub const WELCOME: &str =
    "Welcome to the product QR service. Scan a product QR code to see its details.";

const HTML: &str = "text/html; charset=utf-8";

/// `200 OK` with the product detail page.
pub fn product_detail(product: &Product) -> Response {
    Response::new(StatusCode::Ok)
        .header("Content-Type", HTML)
        .body(render_product(product))
}

/// `404 Not Found` with the not-found page.
pub fn product_not_found() -> Response {
    Response::new(StatusCode::NotFound)
        .header("Content-Type", HTML)
        .body(layout(
            "Product not found",
            "<h1>Product not found</h1>\n\
             <p>The scanned code does not match any product in our catalog.</p>\n",
        ))
}

/// `200 OK` with the welcome text.
pub fn welcome() -> Response {
    Response::new(StatusCode::Ok).body(WELCOME)
}

/// Renders the detail page for `product`.
pub fn render_product(product: &Product) -> String {
    let title = escape(product.name().unwrap_or(product.identifier()));

    let mut main = format!("<h1>{title}</h1>\n<dl>\n");
    for (field, value) in product.fields() {
        if field == IDENTIFIER_FIELD {
            continue;
        }
        let _ = writeln!(
            main,
            "  <dt>{}</dt><dd>{}</dd>",
            escape(field),
            escape(&display_value(value))
        );
    }
    main.push_str("</dl>\n");
    let _ = writeln!(
        main,
        "<p class=\"code\">{}</p>",
        escape(product.identifier())
    );

    layout(&title, &main)
}

fn layout(title: &str, main: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         </head>\n\
         <body>\n\
         <main>\n{main}</main>\n\
         </body>\n\
         </html>\n"
    )
}

// Strings render bare; everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Escapes text for inclusion in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
