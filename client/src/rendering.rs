//! Plain-text rendering of server pushes for the terminal client

use crate::game::{ClientGameState, CurrentQuestion};
use shared::{ResultKind, ServerMessage, Standing};

/// Formats whole currency units with thousands separators, e.g. `$1,500,000`
pub fn format_money(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${}", grouped)
}

pub fn render_question(question: &CurrentQuestion) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "--- Level {} for {} ---",
            question.level,
            format_money(question.prize)
        ),
        question.prompt.clone(),
    ];
    for (i, choice) in question.choices.iter().enumerate() {
        lines.push(format!("  {}) {}", i + 1, choice));
    }
    lines.push("Answer with 1-4, or 's' to stop and keep your prize".to_string());
    lines
}

/// Standings as an aligned table. The row for `own_name` is marked with `>`.
pub fn render_standings(players: &[Standing], own_name: &str) -> Vec<String> {
    let name_width = players
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Player".len());
    let prizes: Vec<String> = players.iter().map(|p| format_money(p.prize)).collect();
    let prize_width = prizes
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("Prize".len());

    let mut lines = vec![format!(
        "  {:<name_width$}  {:>5}  {:>prize_width$}  {}",
        "Player",
        "Level",
        "Prize",
        "Status",
        name_width = name_width,
        prize_width = prize_width
    )];
    for (player, prize) in players.iter().zip(&prizes) {
        let marker = if player.name == own_name { '>' } else { ' ' };
        lines.push(format!(
            "{} {:<name_width$}  {:>5}  {:>prize_width$}  {}",
            marker,
            player.name,
            player.level,
            prize,
            player.status.label(),
            name_width = name_width,
            prize_width = prize_width
        ));
    }
    lines
}

/// Lines to print for one server push, after it has been applied to `state`
pub fn render_message(message: &ServerMessage, state: &ClientGameState) -> Vec<String> {
    match message {
        ServerMessage::Connected { welcome } => vec![welcome.clone()],
        ServerMessage::Error { reason } => vec![format!("Error: {}", reason)],
        ServerMessage::GameStarted => vec!["=== The game has started! ===".to_string()],
        ServerMessage::Question { .. } => state
            .question
            .as_ref()
            .map(render_question)
            .unwrap_or_default(),
        ServerMessage::Result {
            outcome,
            prize,
            level,
        } => vec![match outcome {
            ResultKind::Correct => format!(
                "Correct! You reached level {} and bank {}",
                level,
                format_money(*prize)
            ),
            ResultKind::Incorrect => {
                "Wrong answer, you are eliminated and leave with nothing".to_string()
            }
            ResultKind::Stopped => format!(
                "You stopped at level {} and keep {}",
                level,
                format_money(*prize)
            ),
        }],
        ServerMessage::Standings { players } => {
            let mut lines = vec![String::new(), "Standings:".to_string()];
            lines.extend(render_standings(players, state.name()));
            lines
        }
        ServerMessage::GameOver { winner, prize } => vec![match winner {
            Some(_) if state.is_winner() => {
                format!("=== Game over! You win with {} ===", format_money(*prize))
            }
            Some(winner) => format!(
                "=== Game over! {} wins with {} ===",
                winner,
                format_money(*prize)
            ),
            None => "=== Game over! Nobody is left standing ===".to_string(),
        }],
        ServerMessage::Chat { sender, text } => vec![format!("[{}] {}", sender, text)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PlayerStatus;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0), "$0");
        assert_eq!(format_money(999), "$999");
        assert_eq!(format_money(1_000), "$1,000");
        assert_eq!(format_money(50_000), "$50,000");
        assert_eq!(format_money(1_500_000), "$1,500,000");
        assert_eq!(format_money(20_000_000), "$20,000,000");
    }

    #[test]
    fn test_question_lists_numbered_choices() {
        let question = CurrentQuestion {
            prompt: "Which layer does TCP belong to?".to_string(),
            choices: ["Transport", "Network", "Session", "Link"].map(str::to_string),
            level: 3,
            prize: 10_000,
        };

        let lines = render_question(&question);
        assert!(lines[1].contains("Level 3"));
        assert!(lines[1].contains("$10,000"));
        assert_eq!(lines[2], "Which layer does TCP belong to?");
        assert_eq!(lines[3], "  1) Transport");
        assert_eq!(lines[6], "  4) Link");
    }

    #[test]
    fn test_standings_table_is_aligned() {
        let players = vec![
            Standing {
                name: "ana".to_string(),
                level: 12,
                prize: 3_000_000,
                status: PlayerStatus::Active,
            },
            Standing {
                name: "bartholomew".to_string(),
                level: 0,
                prize: 0,
                status: PlayerStatus::Eliminated,
            },
        ];

        let lines = render_standings(&players, "ana");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("> ana"));
        assert!(lines[2].starts_with("  bartholomew"));
        assert!(lines[2].ends_with("ELIMINATED"));

        let status_column = lines[0].find("Status").unwrap();
        assert_eq!(lines[1].find("ACTIVE"), Some(status_column));
        assert_eq!(lines[2].find("ELIMINATED"), Some(status_column));
    }

    #[test]
    fn test_game_over_messages() {
        let mut state = ClientGameState::new("ana");
        let message = ServerMessage::GameOver {
            winner: Some("bruno".to_string()),
            prize: 30_000,
        };
        state.apply(&message);
        assert_eq!(
            render_message(&message, &state),
            vec!["=== Game over! bruno wins with $30,000 ===".to_string()]
        );

        let message = ServerMessage::GameOver {
            winner: None,
            prize: 0,
        };
        assert!(render_message(&message, &state)[0].contains("Nobody"));
    }
}
