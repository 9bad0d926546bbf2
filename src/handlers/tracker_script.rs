use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::bots::AI_BOTS;
use crate::routes::AppState;

/// The snippet site owners embed:
/// `<script src=".../client/ai-pixel-tracker.js" data-tracking-id="...">`.
///
/// The bot table is rendered from the server's own classification table as
/// an ordered array of pairs, walked top to bottom, so the snippet detects
/// exactly what the server would.
pub async fn serve_tracker_script(State(state): State<AppState>) -> impl IntoResponse {
    let script = render_tracker_script(&state.public_url);
    ([(header::CONTENT_TYPE, "application/javascript")], script)
}

pub(crate) fn render_tracker_script(public_url: &str) -> String {
    let table: String = AI_BOTS
        .iter()
        .map(|(token, description)| format!("    ['{token}', '{description}'],\n"))
        .collect();

    TEMPLATE
        .replace("__AI_BOTS__", table.trim_end())
        .replace("__ENDPOINT__", &format!("{public_url}/api/track"))
}

const TEMPLATE: &str = r#"(function() {
  'use strict';

  var AI_BOTS = [
__AI_BOTS__
  ];

  function detectAIBot() {
    var userAgent = navigator.userAgent;
    for (var i = 0; i < AI_BOTS.length; i++) {
      if (userAgent.indexOf(AI_BOTS[i][0]) !== -1) {
        return { detected: true, name: AI_BOTS[i][0], description: AI_BOTS[i][1] };
      }
    }
    return { detected: false };
  }

  function sessionId() {
    try {
      var sid = sessionStorage.getItem('aiPixelSession');
      if (!sid) {
        sid = Math.random().toString(36).slice(2) + Date.now().toString(36);
        sessionStorage.setItem('aiPixelSession', sid);
      }
      return sid;
    } catch (e) {
      return null;
    }
  }

  function sendEvent(eventData) {
    var trackingId = (document.currentScript && document.currentScript.getAttribute('data-tracking-id')) ||
      (document.querySelector('[data-tracking-id]') && document.querySelector('[data-tracking-id]').getAttribute('data-tracking-id'));

    if (!trackingId) {
      console.warn('AI Pixel: No tracking ID found');
      return;
    }

    var payload = {
      trackingId: trackingId,
      timestamp: new Date().toISOString(),
      url: window.location.href,
      referrer: document.referrer,
      sessionId: sessionId()
    };
    for (var key in eventData) {
      payload[key] = eventData[key];
    }

    var endpoint = '__ENDPOINT__';
    var body = JSON.stringify(payload);

    if (navigator.sendBeacon) {
      navigator.sendBeacon(endpoint, body);
    } else {
      fetch(endpoint, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: body,
        keepalive: true
      }).catch(function (e) { console.log('AI Pixel tracking failed:', e); });
    }
  }

  function init() {
    var detection = detectAIBot();

    sendEvent({ type: 'page_view' });

    if (detection.detected) {
      sendEvent({
        type: 'ai_bot_detected',
        data: { name: detection.name, description: detection.description }
      });
    }
  }

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', init);
  } else {
    init();
  }
})();
"#;
