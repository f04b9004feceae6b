// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation message operations.

use std::str::FromStr;

use casebot_core::CaseError;
use casebot_core::types::{ChatMessage, ChatRole};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::{Database, map_tr_err};

/// Insert a conversation message.
pub async fn insert_message(db: &Database, msg: &ChatMessage) -> Result<(), CaseError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (id, sender_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.id,
                    msg.sender_id,
                    msg.role.to_string(),
                    msg.content,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The last `limit` messages of a sender in insertion order.
pub async fn recent_messages(
    db: &Database,
    sender_id: &str,
    limit: usize,
) -> Result<Vec<ChatMessage>, CaseError> {
    let sender_id = sender_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| -> Result<Vec<ChatMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, role, content, created_at FROM (
                     SELECT rowid AS seq, id, sender_id, role, content, created_at
                     FROM messages WHERE sender_id = ?1
                     ORDER BY rowid DESC LIMIT ?2
                 ) ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![sender_id, limit], |row| {
                let role: String = row.get(2)?;
                Ok(ChatMessage {
                    id: row.get(0)?,
                    sender_id: row.get(1)?,
                    role: ChatRole::from_str(&role).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
                    })?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
