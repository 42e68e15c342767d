// ============================================
// src/ui.rs
// 画面描画
// ============================================

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::app::{App, Screen};
use crate::quiz::{CHOICE_COUNT, Feedback, Quiz};

const HELP: &str = "1-4: answer  ←/→ + Enter: select  Space: show answer  m: mode  p: audio  Esc: quit";

pub fn ui(f: &mut Frame, app: &App) {
    let size = f.area();
    // 枠線を描画
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" kanaquiz [{}] ", app.mode()));
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    match &app.screen {
        Screen::Loading { error } => draw_loading(f, inner_area, error.as_deref()),
        Screen::Quiz(quiz) => draw_quiz(f, inner_area, app, quiz),
    }
}

fn draw_loading(f: &mut Frame, area: Rect, error: Option<&str>) {
    let mut lines = vec![Line::from("Loading...").bold()];
    if let Some(error) = error {
        lines.push(Line::from(""));
        lines.push(Line::from(error.to_string()).style(Style::default().fg(Color::Red)));
        lines.push(Line::from("Esc: quit").style(Style::default().fg(Color::DarkGray)));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(1)])
        .split(area);
    f.render_widget(
        Paragraph::new(lines).centered().wrap(Wrap { trim: true }),
        chunks[1],
    );
}

fn draw_quiz(f: &mut Frame, area: Rect, app: &App, quiz: &Quiz) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] 進捗
            Constraint::Length(1), // [1] 空白
            Constraint::Length(2), // [2] 前回の答え
            Constraint::Length(1), // [3] 空白
            Constraint::Length(3), // [4] 選択肢
            Constraint::Min(1),    // [5] 余白
            Constraint::Length(1), // [6] ステータスバー
            Constraint::Length(1), // [7] ヘルプ
        ])
        .split(area);

    // 0. 進捗 (何問目 / 全体, 何周目)
    let progress = format!(
        "Question {} / {}   Round {}   Audio: {}",
        quiz.index() + 1,
        quiz.deck().len(),
        quiz.round(),
        if quiz.current().audio.is_empty() { "-" } else { quiz.current().audio.as_str() },
    );
    f.render_widget(
        Paragraph::new(progress).style(Style::default().fg(Color::Gray)).centered(),
        chunks[0],
    );

    // 2. 前回の答え
    if let Some(feedback) = quiz.last() {
        f.render_widget(
            Paragraph::new(feedback_line(feedback, app.reveal))
                .centered()
                .wrap(Wrap { trim: true }),
            chunks[2],
        );
    }

    // 4. 選択肢ボタン (回答直後は前の選択肢を色付きで表示)
    let (choices, highlight) = match &app.flash {
        Some(flash) => (flash.choices.as_slice(), Some((flash.taken, flash.correct))),
        None => (quiz.choices(), None),
    };
    let button_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, CHOICE_COUNT as u32); CHOICE_COUNT])
        .split(chunks[4]);
    for (i, choice) in choices.iter().enumerate().take(CHOICE_COUNT) {
        let mut style = Style::default();
        let mut border = Style::default().fg(Color::DarkGray);
        match highlight {
            Some((taken, correct)) if taken == i => {
                let color = if correct { Color::Green } else { Color::Red };
                style = style.fg(Color::Black).bg(color);
                border = border.fg(color);
            }
            None if app.cursor == i => border = border.fg(Color::White),
            _ => {}
        }
        let button = Paragraph::new(choice.as_str())
            .style(style)
            .centered()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(format!(" {} ", i + 1)),
            );
        f.render_widget(button, button_areas[i]);
    }

    // 6. ステータスバー
    let stats = quiz.stats();
    let session = match stats.accuracy() {
        Some(acc) => format!("Session: {}/{} ({:.0}%)", stats.correct, stats.answered, acc),
        None => "Session: -".to_string(),
    };
    let pd = &app.player_data;
    let lifetime = match pd.accuracy() {
        Some(acc) => format!("Total: {}/{} ({:.0}%)", pd.total_correct, pd.total_answered, acc),
        None => "Total: -".to_string(),
    };
    let mut spans = vec![
        Span::styled(session, Style::default().fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled(lifetime, Style::default().fg(Color::Magenta)),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(status.as_str(), Style::default().fg(Color::Red)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)).centered(), chunks[6]);

    // 7. ヘルプ
    f.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)).centered(),
        chunks[7],
    );
}

/// 正解なら「答え - 意味」(緑)、不正解なら取り消し線付きの選択と [答え - 意味] (赤)
pub fn feedback_line(feedback: &Feedback, reveal: bool) -> Line<'static> {
    let mut spans = if feedback.is_correct() {
        let style = Style::default().fg(Color::Green);
        vec![Span::styled(
            format!("{} - {}", feedback.correct, feedback.meaning),
            style,
        )]
    } else {
        let style = Style::default().fg(Color::Red);
        vec![
            Span::styled(feedback.taken.clone(), style.add_modifier(Modifier::CROSSED_OUT)),
            Span::styled(
                format!(" [{} - {}]", feedback.correct, feedback.meaning),
                style,
            ),
        ]
    };

    // ぼかし: 色は残したまま文字を伏せる
    if !reveal {
        for span in &mut spans {
            span.content = mask(&span.content).into();
        }
    }
    Line::from(spans)
}

/// 表示幅を保ったまま伏せ字にする (全角文字は ░ 2つ)
fn mask(text: &str) -> String {
    let mut masked = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() {
            masked.push(c);
        } else {
            let width = c.width().unwrap_or(1).max(1);
            masked.extend(std::iter::repeat_n('░', width));
        }
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_correct_feedback() {
        let fb = Feedback {
            taken: "猫".into(),
            correct: "猫".into(),
            meaning: "cat".into(),
        };
        let line = feedback_line(&fb, true);
        assert_eq!(text(&line), "猫 - cat");
        assert_eq!(line.spans[0].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_wrong_feedback_strikes_taken_answer() {
        let fb = Feedback {
            taken: "犬".into(),
            correct: "猫".into(),
            meaning: "cat".into(),
        };
        let line = feedback_line(&fb, true);
        assert_eq!(text(&line), "犬 [猫 - cat]");
        assert!(line.spans[0].style.add_modifier.contains(Modifier::CROSSED_OUT));
        assert_eq!(line.spans[1].style.fg, Some(Color::Red));
    }

    #[test]
    fn test_hidden_feedback_is_masked() {
        let fb = Feedback {
            taken: "犬".into(),
            correct: "猫".into(),
            meaning: "cat".into(),
        };
        let hidden = text(&feedback_line(&fb, false));
        let revealed = text(&feedback_line(&fb, true));
        assert!(!hidden.contains('猫'));
        assert!(!hidden.contains("cat"));
        assert_eq!(Line::from(hidden.clone()).width(), Line::from(revealed).width());
    }

    #[test]
    fn test_mask_keeps_display_width() {
        assert_eq!(mask("ねこ"), "░░░░");
        assert_eq!(mask("猫(ねこ)"), "░░░░░░░░");
        assert_eq!(mask("cat dog"), "░░░ ░░░");
        assert_eq!(mask(""), "");
    }
}
