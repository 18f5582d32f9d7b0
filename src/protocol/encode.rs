// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Response encoding.
//!
//! Encoding never fails outward: a response that cannot be serialized
//! degrades to a hand-assembled `internal_error` envelope carrying a
//! correlation id, and the real error goes to the log under that id.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::WireResponse;

static ENCODE_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn encode_response(response: &WireResponse) -> Vec<u8> {
    match serde_json::to_vec(response) {
        Ok(bytes) => bytes,
        Err(err) => {
            let correlation =
                format!("enc-{}", ENCODE_FAILURES.fetch_add(1, Ordering::Relaxed));
            tracing::error!(%correlation, error = %err, "response encoding failed");
            // Assembled by hand so this path cannot itself fail.
            format!(
                r#"{{"status":"error","error":{{"kind":"internal_error","message":"response could not be encoded","correlation":"{correlation}"}}}}"#
            )
            .into_bytes()
        }
    }
}
