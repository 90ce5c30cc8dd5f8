//! Streak report formatting.
//!
//! Renders the streak table into the HTML report blocks the admins
//! receive each cycle, and chunks them to respect Telegram's message
//! size constraints.

use crate::streaks::StreakTable;

/// Maximum number of report blocks joined into one dispatched message.
pub const REPORT_CHUNK_SIZE: usize = 50;

/// Russian plural form of «лог» for a streak count.
///
/// 1 → «лог», 2..4 → «лога», 5..20 → «логов», further by the usual
/// last-digit rules with the 11..14 exception.
#[must_use]
pub fn ru_plural_logs(n: u64) -> &'static str {
    if (11..=14).contains(&(n % 100)) {
        return "логов";
    }
    match n % 10 {
        1 => "лог",
        2..=4 => "лога",
        _ => "логов",
    }
}

/// Render one text block per user with at least one active IP.
///
/// Users are sorted by descending active-IP count (stable sort, so ties
/// keep the table's lexicographic username order); within a block, IPs
/// are sorted by descending streak. Usernames are HTML-escaped because
/// the blocks are dispatched with HTML parse mode.
#[must_use]
pub fn format_streak_blocks(table: &StreakTable) -> Vec<String> {
    let mut users: Vec<_> = table.iter().collect();
    users.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let mut blocks = Vec::new();
    for (user, ip_map) in users {
        if ip_map.is_empty() {
            continue;
        }
        let mut ips: Vec<(&String, &u64)> = ip_map.iter().collect();
        ips.sort_by(|a, b| b.1.cmp(a.1));

        let header = format!(
            "{} всего {} активных ip",
            html_escape::encode_text(user),
            ips.len()
        );
        let lines: Vec<String> = ips
            .iter()
            .map(|(ip, streak)| format!("- {ip} ({streak} {} подряд)", ru_plural_logs(**streak)))
            .collect();
        blocks.push(format!("{header}  \n{}", lines.join("\n")));
    }
    blocks
}

/// Trailing summary line with the total tracked-IP count.
#[must_use]
pub fn summary_line(total_ips: usize) -> String {
    format!("---------\nВсего активных IP: <b>{total_ips}</b>")
}

/// Split blocks into chunks of at most `chunk_size`, joined by a blank
/// line.
#[must_use]
pub fn chunk_blocks(blocks: &[String], chunk_size: usize) -> Vec<String> {
    blocks
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.join("\n\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn plural_forms_match_russian_rules() {
        let cases = [
            (1, "лог"),
            (2, "лога"),
            (3, "лога"),
            (4, "лога"),
            (5, "логов"),
            (11, "логов"),
            (12, "логов"),
            (21, "лог"),
            (22, "лога"),
            (101, "лог"),
            (111, "логов"),
            (112, "логов"),
        ];
        for (n, expected) in cases {
            assert_eq!(ru_plural_logs(n), expected, "n = {n}");
        }
    }

    #[test]
    fn blocks_sorted_by_ip_count_then_streak() {
        let mut table = StreakTable::new();
        let mut cycle = HashMap::new();
        cycle.insert("alice".to_string(), vec!["1.1.1.1".to_string()]);
        cycle.insert(
            "bob".to_string(),
            vec!["2.2.2.2".to_string(), "3.3.3.3".to_string()],
        );
        table.apply(&cycle);
        // Second cycle: only one of bob's IPs stays active.
        let mut cycle = HashMap::new();
        cycle.insert("alice".to_string(), vec!["1.1.1.1".to_string()]);
        cycle.insert(
            "bob".to_string(),
            vec!["2.2.2.2".to_string(), "4.4.4.4".to_string()],
        );
        table.apply(&cycle);

        let blocks = format_streak_blocks(&table);
        assert_eq!(blocks.len(), 2);
        // bob has two active IPs and comes first.
        assert!(blocks[0].starts_with("bob всего 2 активных ip"));
        // His longer streak is listed first.
        assert_eq!(
            blocks[0],
            "bob всего 2 активных ip  \n- 2.2.2.2 (2 лога подряд)\n- 4.4.4.4 (1 лог подряд)"
        );
        assert_eq!(
            blocks[1],
            "alice всего 1 активных ip  \n- 1.1.1.1 (2 лога подряд)"
        );
    }

    #[test]
    fn empty_table_yields_no_blocks() {
        let table = StreakTable::new();
        assert!(format_streak_blocks(&table).is_empty());
    }

    #[test]
    fn chunking_splits_by_fifty() {
        let blocks: Vec<String> = (0..120).map(|i| format!("block {i}")).collect();
        let chunks = chunk_blocks(&blocks, REPORT_CHUNK_SIZE);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].matches("block ").count(), 50);
        assert_eq!(chunks[1].matches("block ").count(), 50);
        assert_eq!(chunks[2].matches("block ").count(), 20);
    }

    #[test]
    fn summary_line_embeds_total() {
        assert_eq!(
            summary_line(7),
            "---------\nВсего активных IP: <b>7</b>"
        );
    }
}
