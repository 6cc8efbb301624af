/// Single-page UI: topic form, live progress, rendered post and download link.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AI Blog Writer</title>
<script src="https://cdn.jsdelivr.net/npm/marked/marked.min.js"></script>
<style>
  body { margin: 0; font-family: system-ui, sans-serif; display: flex; min-height: 100vh; }
  aside { width: 260px; background: #f4f4f6; padding: 1.5rem; box-sizing: border-box; font-size: 0.9rem; }
  aside dt { font-weight: 600; margin-top: 0.8rem; }
  aside dd { margin: 0; word-break: break-all; color: #444; }
  main { flex: 1; padding: 2rem 3rem; max-width: 900px; }
  form { display: flex; gap: 0.5rem; }
  input { flex: 1; padding: 0.6rem; font-size: 1rem; }
  button { padding: 0.6rem 1.2rem; font-size: 1rem; cursor: pointer; }
  button:disabled { cursor: wait; opacity: 0.6; }
  #progress { color: #555; font-size: 0.9rem; margin: 1rem 0; padding-left: 1.2rem; }
  #status.error { color: #b00020; }
  #status.ok { color: #1b7f3b; }
  #post { border-top: 1px solid #ddd; margin-top: 1rem; padding-top: 1rem; }
  #post pre { white-space: pre-wrap; }
  #download { display: none; margin-top: 1rem; }
</style>
</head>
<body>
<aside>
  <h3>Configuration</h3>
  <dl id="config"><dd>Loading...</dd></dl>
</aside>
<main>
  <h1>AI Blog Writer</h1>
  <p>Enter a topic and a crew of agents will research it and write a blog post.</p>
  <form id="topic-form">
    <input id="topic" placeholder="e.g. The future of home automation" autocomplete="off">
    <button id="generate" type="submit">Generate</button>
  </form>
  <p id="status"></p>
  <ul id="progress"></ul>
  <a id="download" download>Download Markdown</a>
  <article id="post"></article>
</main>
<script>
const $ = (id) => document.getElementById(id);

function setStatus(text, kind) {
  $("status").textContent = text;
  $("status").className = kind || "";
}

function renderMarkdown(markdown) {
  const post = $("post");
  if (window.marked && typeof window.marked.parse === "function") {
    post.innerHTML = window.marked.parse(markdown);
  } else {
    const pre = document.createElement("pre");
    pre.textContent = markdown;
    post.replaceChildren(pre);
  }
}

async function loadConfig() {
  const list = $("config");
  try {
    const config = await (await fetch("/config")).json();
    const rows = [
      ["Variant", config.variant],
      ["Crew", config.crew],
      ["Model", config.model],
      ["API base", config.api_base],
      ["Tool server", config.mcp_endpoint],
      ["Tools", (config.tools || []).join(", ")],
    ];
    list.replaceChildren();
    for (const [label, value] of rows) {
      if (!value) continue;
      const dt = document.createElement("dt");
      dt.textContent = label;
      const dd = document.createElement("dd");
      dd.textContent = value;
      list.append(dt, dd);
    }
  } catch (err) {
    list.textContent = "Configuration unavailable";
  }
}

async function finish(run) {
  const response = await fetch(`/runs/${run}`);
  const data = await response.json();
  if (data.state === "Completed" && data.markdown) {
    renderMarkdown(data.markdown);
    const link = $("download");
    link.href = `/runs/${run}/download`;
    link.setAttribute("download", data.filename);
    link.style.display = "inline-block";
  }
}

$("topic-form").addEventListener("submit", async (event) => {
  event.preventDefault();
  $("progress").replaceChildren();
  $("post").replaceChildren();
  $("download").style.display = "none";

  const response = await fetch("/runs", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ topic: $("topic").value }),
  });
  const body = await response.json();
  if (!response.ok) {
    setStatus(body.error, "error");
    return;
  }

  $("generate").disabled = true;
  setStatus("Researching and writing your blog post...");

  const source = new EventSource(`/runs/${body.id}/events`);
  source.onmessage = async (message) => {
    const data = JSON.parse(message.data);
    if (data.type !== "finished") {
      const item = document.createElement("li");
      item.textContent = data.text;
      $("progress").append(item);
      return;
    }
    source.close();
    $("generate").disabled = false;
    setStatus(data.text, data.success ? "ok" : "error");
    if (data.success) await finish(body.id);
  };
  source.onerror = () => {
    source.close();
    $("generate").disabled = false;
    finish(body.id);
  };
});

loadConfig();
</script>
</body>
</html>
"#;
