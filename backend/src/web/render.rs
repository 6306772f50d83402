//! HTML rendering for the board page and request cards.
//!
//! Every user-supplied string goes through [`escape_html`].

use chrono::{DateTime, Utc};

use crate::models::{ListQuery, SortBy, User, VideoRequest};

/// Everything the board page shows.
pub struct Page<'a> {
    /// The signed-in user; `None` renders the login form instead of the board.
    pub user: Option<&'a User>,
    pub query: &'a ListQuery,
    pub requests: &'a [VideoRequest],
}

/// Escape text for use in element content and quoted attribute values.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Date as shown on cards, e.g. `Mon Oct 19 2026`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a %b %d %Y").to_string()
}

/// Render one request as a card. The score is ups minus downs.
pub fn render_card(request: &VideoRequest) -> String {
    let id = escape_html(&request.id);

    let expected_result = request
        .expected_result
        .as_deref()
        .map(|text| {
            format!(
                r#"<p class="mb-0 text-muted"><strong>Expected results:</strong> {}</p>"#,
                escape_html(text)
            )
        })
        .unwrap_or_default();

    let video_link = request
        .video_ref
        .as_ref()
        .map(|video| {
            format!(
                r#" &bullet; <a href="{}" target="_blank" rel="noopener">watch</a>"#,
                escape_html(&video.link)
            )
        })
        .unwrap_or_default();

    let author = request.author_name.as_deref().unwrap_or("anonymous");

    format!(
        r#"<div class="card mb-3" id="request_{id}">
  <div class="card-body d-flex justify-content-between flex-row">
    <div class="d-flex flex-column">
      <h3>{title}</h3>
      <p class="text-muted mb-2">{details}</p>
      {expected_result}
    </div>
    <div class="d-flex flex-column text-center">
      <a class="btn btn-link" data-vote="ups" data-id="{id}">&#x1F53A;</a>
      <h3 id="voteScore_{id}">{score}</h3>
      <a class="btn btn-link" data-vote="downs" data-id="{id}">&#x1F53B;</a>
    </div>
  </div>
  <div class="card-footer d-flex flex-row justify-content-between">
    <div>
      <span class="text-info">{status}</span>
      &bullet; added by <strong>{author}</strong> on
      <strong>{date}</strong>{video_link}
    </div>
    <div class="d-flex justify-content-center flex-column ml-auto mr-2">
      <div class="badge badge-success">{level}</div>
    </div>
  </div>
</div>
"#,
        id = id,
        title = escape_html(&request.topic_title),
        details = escape_html(&request.topic_details),
        expected_result = expected_result,
        score = request.votes.score(),
        status = request.status.as_str().to_uppercase(),
        author = escape_html(author),
        date = format_date(&request.submit_date),
        video_link = video_link,
        level = request.target_level.as_str(),
    )
}

/// Render a list of cards, or a note when there is nothing to show.
pub fn render_cards(requests: &[VideoRequest]) -> String {
    if requests.is_empty() {
        return r#"<p class="text-muted" id="emptyState">No video requests yet.</p>"#.to_string();
    }
    requests.iter().map(render_card).collect()
}

/// Render the full board page.
pub fn render_page(page: &Page<'_>) -> String {
    let (content, script) = match page.user {
        Some(user) => (
            render_board(user, page.query, page.requests),
            r#"<script src="/assets/app.js" defer></script>"#,
        ),
        None => (LOGIN_FORM.to_string(), ""),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Video Requests</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@4.6.2/dist/css/bootstrap.min.css">
</head>
<body>
  <div class="container my-4">
    <h1 class="mb-4">Video Requests</h1>
{content}
  </div>
  {script}
</body>
</html>
"#
    )
}

const LOGIN_FORM: &str = r#"    <form class="login-form" method="post" action="/users/login">
      <div class="form-group">
        <label for="author_name">Name</label>
        <input class="form-control" id="author_name" name="author_name" required>
      </div>
      <div class="form-group">
        <label for="author_email">Email</label>
        <input class="form-control" type="email" id="author_email" name="author_email" required>
      </div>
      <button class="btn btn-primary" type="submit">Start voting</button>
    </form>"#;

fn render_board(user: &User, query: &ListQuery, requests: &[VideoRequest]) -> String {
    let active = |sort_by: SortBy| {
        if query.sort_by == sort_by {
            (" active", " checked")
        } else {
            ("", "")
        }
    };
    let (newly_active, newly_checked) = active(SortBy::NewlyAdded);
    let (top_active, top_checked) = active(SortBy::TopVoted);

    format!(
        r#"    <div class="app-content" data-user-id="{user_id}">
      <p class="text-muted">Signed in as <strong>{user_name}</strong></p>
      <form id="videoRequestForm" novalidate>
        <div class="form-group">
          <label for="topic_title">Topic</label>
          <input class="form-control" id="topic_title" name="topic_title">
          <div class="invalid-feedback">A topic of at most {max_title} characters is required.</div>
        </div>
        <div class="form-group">
          <label for="topic_details">Details</label>
          <textarea class="form-control" id="topic_details" name="topic_details"></textarea>
          <div class="invalid-feedback">Details are required.</div>
        </div>
        <div class="form-group">
          <label for="expected_result">Expected result</label>
          <textarea class="form-control" id="expected_result" name="expected_result"></textarea>
        </div>
        <div class="form-group">
          <label for="target_level">Target level</label>
          <select class="form-control" id="target_level" name="target_level">
            <option value="beginner">Beginner</option>
            <option value="medium">Medium</option>
            <option value="advanced">Advanced</option>
          </select>
        </div>
        <button class="btn btn-primary" type="submit">Send video request</button>
      </form>
      <hr>
      <div class="d-flex justify-content-between mb-3">
        <div class="btn-group btn-group-toggle">
          <label class="btn btn-outline-primary{newly_active}" id="sortBy_NewlyAdded">
            <input type="radio" name="sortBy" value="{newly_value}"{newly_checked}> New first
          </label>
          <label class="btn btn-outline-primary{top_active}" id="sortBy_TopVoted">
            <input type="radio" name="sortBy" value="{top_value}"{top_checked}> Top voted first
          </label>
        </div>
        <input type="search" class="form-control w-50" id="searchBox" placeholder="Search..." value="{search}">
      </div>
      <div id="listOfRequests">
{cards}
      </div>
    </div>"#,
        user_id = escape_html(&user.id),
        user_name = escape_html(&user.author_name),
        max_title = crate::models::MAX_TITLE_LENGTH,
        newly_value = SortBy::NewlyAdded.as_str(),
        newly_active = newly_active,
        newly_checked = newly_checked,
        top_value = SortBy::TopVoted.as_str(),
        top_active = top_active,
        top_checked = top_checked,
        search = escape_html(query.search_key.as_deref().unwrap_or_default()),
        cards = render_cards(requests),
    )
}
