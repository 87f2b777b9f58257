//! Inline HTML for the single page this service renders
//!
//! Login prompt or profile card depending on session state, with the
//! one-shot flash message as a success or error banner.

use crate::auth::models::Identity;

/// Render the `/` page from session state.
///
/// A flash containing "failed" renders as an error banner, anything else
/// as a success banner.
pub fn render_index(user: Option<&Identity>, message: Option<&str>) -> String {
    let body = match user {
        Some(user) => profile_card(user, message),
        None => login_prompt(message),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Google Auth App</title>
  <style>
    body {{
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      display: flex;
      justify-content: center;
      align-items: center;
      height: 100vh;
      margin: 0;
      background-color: #f5f5f5;
    }}
    .container {{
      text-align: center;
      width: 100%;
      max-width: 400px;
    }}
    .card {{
      background-color: white;
      padding: 32px;
      border-radius: 16px;
      box-shadow: 0 10px 25px rgba(0,0,0,0.1);
    }}
    .google-btn {{
      background-color: #4285f4;
      color: white;
      padding: 12px 24px;
      border: none;
      border-radius: 50px;
      cursor: pointer;
      font-size: 16px;
      font-weight: 500;
    }}
    .google-btn:hover {{
      background-color: #357abd;
    }}
    .profile-img {{
      border-radius: 50%;
      width: 120px;
      height: 120px;
      margin: 10px 0;
      object-fit: cover;
    }}
    .success-message {{
      color: #28a745;
      background-color: #d4edda;
      border-radius: 8px;
      padding: 10px;
      margin: 15px 0;
      font-size: 14px;
    }}
    .error-message {{
      color: #dc3545;
      background-color: #f8d7da;
      border-radius: 8px;
      padding: 10px;
      margin: 15px 0;
      font-size: 14px;
    }}
    .user-name {{
      font-size: 28px;
      font-weight: 600;
      color: #333;
      margin: 10px 0;
    }}
  </style>
</head>
<body>
  <div class="container">
{body}
  </div>
</body>
</html>
"#
    )
}

fn flash_banner(message: Option<&str>) -> String {
    match message {
        Some(text) => {
            let class = if text.contains("failed") {
                "error-message"
            } else {
                "success-message"
            };
            format!(r#"<p class="{}">{}</p>"#, class, escape_html(text))
        }
        None => String::new(),
    }
}

fn profile_card(user: &Identity, message: Option<&str>) -> String {
    let name = user.display_name.as_deref().unwrap_or("User");
    let email = user.email.as_deref().unwrap_or("");
    let picture = user.profile_picture_url.as_deref().unwrap_or("");

    format!(
        r#"    <div class="card">
      {flash}
      <img src="{picture}" alt="Profile" class="profile-img">
      <h2 class="user-name">{name}</h2>
      <p style="color: #666; margin: 0;">{email}</p>
      <p style="margin-top: 20px;">
        <button onclick="window.location.href='/logout'" class="google-btn">Sign Out</button>
      </p>
    </div>"#,
        flash = flash_banner(message),
        picture = escape_html(picture),
        name = escape_html(name),
        email = escape_html(email),
    )
}

fn login_prompt(message: Option<&str>) -> String {
    format!(
        r#"    <div class="card">
      <h2>Welcome Back!</h2>
      <p style="color: #666; margin: 0 0 20px 0;">Please sign in to continue</p>
      {flash}
      <a href="/auth/google" style="text-decoration: none;">
        <button class="google-btn">Sign in with Google</button>
      </a>
    </div>"#,
        flash = flash_banner(message),
    )
}

// Profile fields and provider error detail end up in the page, so they
// get escaped even though Google is the only practical source.
fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
