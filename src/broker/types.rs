//! Wire types for the session broker API

use serde::{Deserialize, Serialize};

use crate::error::{CollectorError, CollectorResult};

/// Connection parameters for a browser the broker has started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
    /// `host:port` of the DevTools endpoint (the broker calls it `selenium`)
    pub debugger_address: String,
    /// Full `ws://…/devtools/browser/…` URL when the broker provides one
    pub websocket_url: Option<String>,
    /// Path of the matching chromedriver; unused over CDP, kept for logs
    pub webdriver_path: Option<String>,
}

impl SessionEndpoints {
    /// URL handed to `Browser::connect`
    ///
    /// Prefers the websocket URL; otherwise the HTTP DevTools endpoint,
    /// from which the websocket URL is discovered.
    #[must_use]
    pub fn cdp_url(&self) -> String {
        match &self.websocket_url {
            Some(ws) if !ws.is_empty() => ws.clone(),
            _ if self.debugger_address.starts_with("http") => self.debugger_address.clone(),
            _ => format!("http://{}", self.debugger_address),
        }
    }
}

/// Answer to a browser start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerReply {
    Started(SessionEndpoints),
    Rejected { code: i64, message: String },
}

#[derive(Debug, Deserialize)]
struct RawReply {
    code: i64,
    #[serde(default)]
    msg: String,
    /// Only decoded for a zero code; rejections carry arbitrary payloads
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawData {
    #[serde(default)]
    webdriver: Option<String>,
    ws: RawWs,
}

#[derive(Debug, Deserialize)]
struct RawWs {
    selenium: String,
    #[serde(default)]
    puppeteer: Option<String>,
}

impl BrokerReply {
    /// Parse the broker's JSON body
    ///
    /// A zero code without usable connection data is treated as a rejection,
    /// since there is nothing to attach to.
    pub fn from_json(body: &str) -> CollectorResult<Self> {
        let raw: RawReply = serde_json::from_str(body).map_err(|e| {
            CollectorError::BrokerUnavailable(format!("unreadable broker response: {e}"))
        })?;

        if raw.code != 0 {
            return Ok(BrokerReply::Rejected {
                code: raw.code,
                message: if raw.msg.is_empty() {
                    "unknown error".to_string()
                } else {
                    raw.msg
                },
            });
        }

        let data = raw
            .data
            .filter(|v| !v.is_null())
            .map(serde_json::from_value::<RawData>);
        match data {
            Some(Ok(data)) => Ok(BrokerReply::Started(SessionEndpoints {
                debugger_address: data.ws.selenium,
                websocket_url: data.ws.puppeteer,
                webdriver_path: data.webdriver,
            })),
            Some(Err(e)) => Ok(BrokerReply::Rejected {
                code: raw.code,
                message: format!("success reply with unusable connection data: {e}"),
            }),
            None => Ok(BrokerReply::Rejected {
                code: raw.code,
                message: "success reply without connection data".to_string(),
            }),
        }
    }
}
