//! Slack request signing.
//!
//! Slack signs `v0:<timestamp>:<raw body>` with HMAC-SHA256 under the app's
//! signing secret and sends `v0=<hex digest>` in `X-Slack-Signature`.
//! Requests older than [`MAX_REQUEST_AGE_SECS`] are refused even when the
//! signature matches, so a captured request cannot be replayed later.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Result, SlackError};

type HmacSha256 = Hmac<Sha256>;

pub const MAX_REQUEST_AGE_SECS: i64 = 5 * 60;

const VERSION: &str = "v0";

/// Check `signature` for a request sent at `timestamp` (unix seconds) with
/// `body`, given the current time `now`.
pub fn verify_request(
    secret: &[u8],
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<()> {
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SlackError::StaleRequest)?;
    if now.abs_diff(sent_at) > MAX_REQUEST_AGE_SECS.unsigned_abs() {
        return Err(SlackError::StaleRequest);
    }

    let digest = signature
        .strip_prefix("v0=")
        .ok_or(SlackError::InvalidSignature)?;
    let expected = hex::decode(digest).map_err(|_| SlackError::InvalidSignature)?;

    let mac = mac_for(secret, timestamp.trim(), body)?;
    mac.verify_slice(&expected)
        .map_err(|_| SlackError::InvalidSignature)
}

/// `v0=<hex>` signature for `body`, as Slack would send it.
pub fn sign_request(secret: &[u8], timestamp: &str, body: &[u8]) -> Result<String> {
    let mac = mac_for(secret, timestamp, body)?;
    Ok(format!(
        "{VERSION}={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn mac_for(secret: &[u8], timestamp: &str, body: &[u8]) -> Result<HmacSha256> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| SlackError::InvalidKey(e.to_string()))?;
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    Ok(mac)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_531_420_618;

    #[test]
    fn matches_slack_documentation_example() {
        // Example from Slack's "Verifying requests from Slack" guide.
        let body = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
        let signature = "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

        verify_request(SECRET, "1531420618", body, signature, NOW).unwrap();
        assert_eq!(sign_request(SECRET, "1531420618", body).unwrap(), signature);
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign_request(SECRET, "1531420618", b"text=hello").unwrap();
        let err = verify_request(SECRET, "1531420618", b"text=hellO", &signature, NOW);
        assert!(matches!(err, Err(SlackError::InvalidSignature)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let signature = sign_request(b"other", "1531420618", b"text=hello").unwrap();
        let err = verify_request(SECRET, "1531420618", b"text=hello", &signature, NOW);
        assert!(matches!(err, Err(SlackError::InvalidSignature)));
    }

    #[test]
    fn enforces_replay_window() {
        let body = b"{}";
        let old = (NOW - MAX_REQUEST_AGE_SECS - 1).to_string();
        let signature = sign_request(SECRET, &old, body).unwrap();
        assert!(matches!(
            verify_request(SECRET, &old, body, &signature, NOW),
            Err(SlackError::StaleRequest)
        ));

        let edge = (NOW - MAX_REQUEST_AGE_SECS).to_string();
        let signature = sign_request(SECRET, &edge, body).unwrap();
        verify_request(SECRET, &edge, body, &signature, NOW).unwrap();
    }

    #[test]
    fn rejects_malformed_headers() {
        assert!(matches!(
            verify_request(SECRET, "yesterday", b"", "v0=00", NOW),
            Err(SlackError::StaleRequest)
        ));
        assert!(matches!(
            verify_request(SECRET, "1531420618", b"", "sha256=00", NOW),
            Err(SlackError::InvalidSignature)
        ));
        assert!(matches!(
            verify_request(SECRET, "1531420618", b"", "v0=zz", NOW),
            Err(SlackError::InvalidSignature)
        ));
        assert!(matches!(
            verify_request(SECRET, "-9223372036854775808", b"", "v0=00", NOW),
            Err(SlackError::StaleRequest)
        ));
        assert!(matches!(
            verify_request(SECRET, "9223372036854775807", b"", "v0=00", -NOW),
            Err(SlackError::StaleRequest)
        ));
    }
}
