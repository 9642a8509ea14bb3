pub fn build_main_ui_html() -> String {
    MAIN_UI_HTML.to_string()
}

const MAIN_UI_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Prompt Builder</title>
  <style>
    :root {
      --bg: #1f2024;
      --panel: #1b1c20;
      --line: #3f4248;
      --input-bg: #272a2f;
      --input-line: #4a4e55;
      --text: #f3f5f7;
      --muted: #9ca2ad;
      --btn-bg: #2a2d33;
      --btn-line: #5b616d;
      --ok: #2f7d4f;
      --err: #8a3434;
      --ctrl-h: 28px;
      --font-sm: 12px;
    }
    * { box-sizing: border-box; }
    body {
      margin: 0;
      color: var(--text);
      background: var(--bg);
      font-family: "Segoe UI", "Yu Gothic UI", "Hiragino Kaku Gothic ProN", sans-serif;
      font-size: 14px;
    }
    .wrap {
      width: 100%;
      min-height: 100vh;
      padding: 8px;
    }
    .frame {
      border: 1px solid var(--line);
      background: var(--panel);
      padding: 6px 10px 10px;
      display: flex;
      flex-direction: column;
      gap: 8px;
    }
    header {
      display: flex;
      align-items: center;
      justify-content: space-between;
      border-bottom: 1px solid #2f3137;
      padding-bottom: 6px;
    }
    h1 {
      margin: 0;
      font-size: 18px;
      font-weight: 600;
    }
    #dropdown-groups {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(220px, 1fr));
      gap: 6px 10px;
    }
    .dropdown-group {
      display: flex;
      flex-direction: column;
      gap: 2px;
    }
    .dropdown-group label {
      color: var(--muted);
      font-size: var(--font-sm);
      font-weight: 600;
    }
    select, textarea, button {
      font: inherit;
    }
    select {
      width: 100%;
      height: var(--ctrl-h);
      border: 1px solid var(--input-line);
      background: var(--input-bg);
      padding: 0 5px;
      border-radius: 4px;
      color: var(--text);
      outline: none;
      font-size: var(--font-sm);
    }
    #language-select {
      width: auto;
    }
    textarea {
      width: 100%;
      min-height: 110px;
      resize: vertical;
      border: 1px solid var(--input-line);
      background: var(--input-bg);
      color: var(--text);
      border-radius: 4px;
      padding: 6px;
    }
    .actions {
      display: flex;
      flex-wrap: wrap;
      gap: 6px;
    }
    button {
      height: var(--ctrl-h);
      padding: 0 12px;
      border: 1px solid var(--btn-line);
      border-radius: 4px;
      background: var(--btn-bg);
      color: var(--text);
      cursor: pointer;
      transition: background 0.2s ease;
    }
    button.idle {
      opacity: 0.6;
    }
    button.flash-ok { background: var(--ok); }
    button.flash-err { background: var(--err); }
    #message {
      min-height: 18px;
      color: var(--muted);
      font-size: var(--font-sm);
    }
  </style>
</head>
<body>
  <div class="wrap">
    <div class="frame">
      <header>
        <h1 id="title">Prompt Builder</h1>
        <select id="language-select"></select>
      </header>
      <div id="dropdown-groups"></div>
      <textarea id="prompt" readonly></textarea>
      <div class="actions">
        <button id="undo-btn" data-text="undo">Undo</button>
        <button id="redo-btn" data-text="redo">Redo</button>
        <button id="random-btn" data-text="random_prompt">Random Prompt</button>
        <button id="copy-prompt-btn" data-text="copy_prompt">Copy Prompt</button>
        <button id="clear-prompt-btn" data-text="clear_prompt">Clear Prompt</button>
      </div>
      <div id="message"></div>
    </div>
  </div>
  <script>
    const SESSION_KEY = "prompt-builder-session";
    let sessionId = Number(sessionStorage.getItem(SESSION_KEY)) || null;
    let texts = {};

    const promptArea = document.getElementById("prompt");
    const messageBox = document.getElementById("message");
    const undoButton = document.getElementById("undo-btn");
    const redoButton = document.getElementById("redo-btn");

    function t(key) {
      return texts[key] || key;
    }

    async function request(path, init) {
      const res = await fetch(path, init);
      const data = await res.json().catch(() => ({ ok: false, error: res.statusText }));
      if (res.status === 404 && path !== "/app/init") {
        await loadSession(true);
        throw new Error(data.error || "session expired");
      }
      if (!res.ok || !data.ok) {
        throw new Error(data.error || `HTTP ${res.status}`);
      }
      return data;
    }

    function post(path, body) {
      return request(path, {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({ session_id: sessionId, ...body }),
      });
    }

    function showMessage(text) {
      messageBox.textContent = text || "";
    }

    function flash(button, ok) {
      if (!button) return;
      const cls = ok ? "flash-ok" : "flash-err";
      button.classList.add(cls);
      setTimeout(() => button.classList.remove(cls), 600);
    }

    function applyView(data) {
      promptArea.value = data.prompt;
      undoButton.classList.toggle("idle", !data.can_undo);
      redoButton.classList.toggle("idle", !data.can_redo);
    }

    function applyTexts() {
      document.getElementById("title").textContent = t("title");
      document.title = t("title");
      promptArea.placeholder = t("prompt_placeholder");
      for (const button of document.querySelectorAll("button[data-text]")) {
        button.textContent = t(button.dataset.text);
      }
    }

    function renderLanguages(languages, current) {
      const select = document.getElementById("language-select");
      select.innerHTML = "";
      for (const lang of languages) {
        const option = document.createElement("option");
        option.value = lang.code;
        option.textContent = lang.name;
        select.appendChild(option);
      }
      select.value = current;
      document.documentElement.lang = current;
    }

    function renderRows(rows) {
      const container = document.getElementById("dropdown-groups");
      container.innerHTML = "";
      for (const row of rows) {
        const group = document.createElement("div");
        group.className = "dropdown-group";

        const label = document.createElement("label");
        label.textContent = row.category;
        group.appendChild(label);

        const select = document.createElement("select");
        const placeholder = document.createElement("option");
        placeholder.value = "";
        placeholder.textContent = row.placeholder;
        select.appendChild(placeholder);
        for (const keyword of row.keywords) {
          const option = document.createElement("option");
          option.value = keyword;
          option.textContent = keyword;
          select.appendChild(option);
        }
        select.addEventListener("change", async () => {
          const keyword = select.value;
          select.value = "";
          await runHistoryOp("/app/append", null, { keyword });
        });

        group.appendChild(select);
        container.appendChild(group);
      }
    }

    function applySnapshot(data) {
      sessionId = data.session_id;
      sessionStorage.setItem(SESSION_KEY, String(sessionId));
      texts = data.texts || {};
      renderLanguages(data.languages || [], data.language);
      applyTexts();
      renderRows(data.rows || []);
      applyView(data);
    }

    async function loadSession(fresh) {
      const query = sessionId && !fresh ? `?session_id=${sessionId}` : "";
      const data = await request(`/app/init${query}`);
      applySnapshot(data);
    }

    async function runHistoryOp(path, button, body) {
      try {
        const data = await post(path, body || {});
        applyView(data);
        if (data.status === "applied" || data.status === "unchanged") {
          showMessage("");
          flash(button, true);
        } else {
          showMessage(t(data.status));
          flash(button, false);
        }
      } catch (err) {
        showMessage(err.message);
        flash(button, false);
      }
    }

    async function copyPrompt(button) {
      try {
        const data = await post("/app/copy", {});
        if (data.skipped) {
          showMessage(t("nothing_to_copy"));
          flash(button, false);
          return;
        }
        if (!data.native) {
          await navigator.clipboard.writeText(data.prompt);
        }
        showMessage(t("prompt_copied"));
        flash(button, true);
      } catch (err) {
        showMessage(err.message);
        flash(button, false);
      }
    }

    undoButton.addEventListener("click", () => runHistoryOp("/app/undo", undoButton));
    redoButton.addEventListener("click", () => runHistoryOp("/app/redo", redoButton));
    const randomButton = document.getElementById("random-btn");
    randomButton.addEventListener("click", () => runHistoryOp("/app/random", randomButton));
    const clearButton = document.getElementById("clear-prompt-btn");
    clearButton.addEventListener("click", () => runHistoryOp("/app/clear", clearButton));
    const copyButton = document.getElementById("copy-prompt-btn");
    copyButton.addEventListener("click", () => copyPrompt(copyButton));

    document.getElementById("language-select").addEventListener("change", async (event) => {
      try {
        const data = await post("/app/language", { language: event.target.value });
        applySnapshot(data);
        showMessage("");
      } catch (err) {
        showMessage(err.message);
      }
    });

    window.addEventListener("pagehide", () => {
      if (!sessionId) return;
      const payload = new Blob([JSON.stringify({ session_id: sessionId })], {
        type: "application/json",
      });
      navigator.sendBeacon("/app/close", payload);
    });

    loadSession(false).catch((err) => showMessage(err.message));
  </script>
</body>
</html>
"#;
