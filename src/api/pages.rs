//! HTML pages shown in the OAuth popup after the provider redirects back.
//!
//! Both pages notify `window.opener` via `postMessage`, targeted at the
//! frontend origin only.

const PAGE_STYLE: &str = "\
body { font-family: -apple-system, sans-serif; display: flex; justify-content: center; \
align-items: center; min-height: 100vh; margin: 0; background: #1a1a2e; color: #fff; }
.container { text-align: center; padding: 40px; background: #16213e; border-radius: 16px; \
box-shadow: 0 8px 32px rgba(0,0,0,0.3); max-width: 500px; }
.icon { font-size: 64px; margin-bottom: 16px; }
h1 { margin: 0 0 8px; font-size: 24px; }
h1.error { color: #ff6b6b; }
p { color: #a0a0b0; margin: 8px 0; word-break: break-all; }
p.hint { color: #666; font-size: 12px; margin-top: 24px; }";

/// Page for a completed connection; closes itself after two seconds
pub fn success_page(display_name: &str, frontend_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Meshy Roblox Bridge - Connected</title>
<style>{style}</style>
</head>
<body>
<div class="container">
    <div class="icon">&#10003;</div>
    <h1>Connected to Roblox!</h1>
    <p>Welcome, {name}</p>
    <p>You can close this window and return to Meshy.</p>
    <p class="hint">This window will close automatically.</p>
</div>
<script>
    if (window.opener) {{
        window.opener.postMessage({{ type: "ROBLOX_OAUTH_SUCCESS" }}, {origin});
    }}
    // The opener reference can be lost across origins, so close regardless
    setTimeout(function() {{ window.close(); }}, 2000);
</script>
</body>
</html>
"#,
        style = PAGE_STYLE,
        name = escape_html(display_name),
        origin = script_string(frontend_url),
    )
}

/// Page for a failed connection; stays open so the user can read it
pub fn error_page(message: &str, frontend_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Meshy Roblox Bridge - Error</title>
<style>{style}</style>
</head>
<body>
<div class="container">
    <div class="icon">&#10007;</div>
    <h1 class="error">Connection Failed</h1>
    <p>{message}</p>
</div>
<script>
    if (window.opener) {{
        window.opener.postMessage({{ type: "ROBLOX_OAUTH_ERROR", error: {error} }}, {origin});
    }}
</script>
</body>
</html>
"#,
        style = PAGE_STYLE,
        message = escape_html(message),
        error = script_string(message),
        origin = script_string(frontend_url),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JSON string literal that cannot terminate the surrounding `<script>`
fn script_string(text: &str) -> String {
    serde_json::Value::String(text.to_string())
        .to_string()
        .replace("</", "<\\/")
}
