use crate::badge::BADGE_COLOR;
use crate::models::TodayCount;

pub fn render_index(today: &TodayCount) -> String {
    INDEX_HTML
        .replace("{{DATE}}", today.date.as_str())
        .replace("{{COUNT}}", &today.count.to_string())
        .replace("{{ACCENT}}", BADGE_COLOR)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Reply Counter</title>
  <style>
    :root {
      --ink: #2b2a28;
      --accent: {{ACCENT}};
      --card: rgba(255, 255, 255, 0.9);
    }

    body {
      margin: 0;
      min-height: 100vh;
      display: grid;
      place-items: center;
      background: linear-gradient(135deg, #f4efff, #ede4ff 60%, #faf7ff 100%);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
    }

    .card {
      background: var(--card);
      border-radius: 24px;
      box-shadow: 0 24px 60px rgba(60, 30, 120, 0.18);
      padding: 32px 48px;
      text-align: center;
    }

    .count {
      font-size: 4rem;
      font-weight: 600;
      color: var(--accent);
      margin: 8px 0;
    }

    .date {
      color: #5f5c57;
    }
  </style>
</head>
<body>
  <main class="card">
    <h1>Replies today</h1>
    <div class="count" id="count">{{COUNT}}</div>
    <div class="date" id="date">{{DATE}}</div>
  </main>
  <script>
    const events = new EventSource('/api/events');
    events.addEventListener('counts', (event) => {
      const change = JSON.parse(event.data);
      document.getElementById('count').textContent = change.count;
      document.getElementById('date').textContent = change.date;
    });
  </script>
</body>
</html>
"#;
