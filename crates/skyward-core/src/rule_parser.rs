//! Keyword and pattern based command parser.
//!
//! Used whenever the language model cannot produce a usable command. Handles
//! Korean and English phrasing for every action the flight controller knows.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Action, Command, ParsedCommand};

const DEFAULT_MOVE_SPEED: f64 = 5.0;
const DEFAULT_RECON_SPEED: f64 = 3.0;
const DEFAULT_TRACKING_DISTANCE: f64 = 5.0;
const DEFAULT_ROTATION_DEG: f64 = 90.0;

const UP: [f64; 3] = [0.0, 1.0, 0.0];
const DOWN: [f64; 3] = [0.0, -1.0, 0.0];

static ALTITUDE_UP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:고도|위로|위쪽|위)\D{0,6}?(\d+(?:\.\d+)?)\s*(?:미터|m)?\D{0,6}?(?:올|높|증가|상승)",
        r"|(\d+(?:\.\d+)?)\s*(?:미터|m)\s*(?:상승|올라)",
        r"|\b(?:up|ascend|climb|rise)\b\D{0,12}?(\d+(?:\.\d+)?)\s*(?:meters?|metres?|m)(?:[^/\w]|$)",
    ))
    .unwrap()
});

static ALTITUDE_DOWN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:고도|아래로|아래쪽|아래)\D{0,6}?(\d+(?:\.\d+)?)\s*(?:미터|m)?\D{0,6}?(?:내|낮|감소|하강)",
        r"|(\d+(?:\.\d+)?)\s*(?:미터|m)\s*(?:하강|내려)",
        r"|\b(?:down|descend|drop|lower)\b\D{0,12}?(\d+(?:\.\d+)?)\s*(?:meters?|metres?|m)(?:[^/\w]|$)",
    ))
    .unwrap()
});

static ALTITUDE_ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)고도\D{0,5}?(\d+(?:\.\d+)?)|\baltitude\b\D{0,12}?(\d+(?:\.\d+)?)").unwrap()
});

static SPEED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(\d+(?:\.\d+)?)\s*(?:m/s|mps|속도|스피드)",
        r"|속[도력]\D{0,5}?(\d+(?:\.\d+)?)",
        r"|\b(?:speed|velocity)\b\D{0,12}?(\d+(?:\.\d+)?)",
    ))
    .unwrap()
});

static DEGREES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:도|°|deg(?:rees?)?\b)").unwrap()
});

static DISTANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:미터|meters?\b|metres?\b|m\b)").unwrap()
});

static ROTATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"회전|돌려|(?i:\b(?:rotate|turn|spin)\b)").unwrap());

static HOVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"정지|제자리|멈춰|멈춤|호버링|(?i:\b(?:hover|stop|halt)\b)").unwrap()
});

static RETURN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"복귀|돌아|귀환|(?i:\breturn\b|\bcome back\b|\bhome\b)").unwrap()
});

static RECON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"정찰|탐색|순찰|(?i:\b(?:recon|reconnaissance|patrol|explore|scout)\b)").unwrap()
});

static TRACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"추적|따라|(?i:\b(?:track|tracking|follow|chase)\b)").unwrap()
});

static MOVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"날아|이동|비행|가줘|(?i:\b(?:fly|move|go)\b)").unwrap()
});

/// Direction keywords in priority order; the first hit wins.
static DIRECTIONS: LazyLock<Vec<(Regex, [f64; 3])>> = LazyLock::new(|| {
    [
        (r"위|(?i:\bup(?:wards?)?\b)", UP),
        (r"아래|(?i:\bdown(?:wards?)?\b)", DOWN),
        (r"앞|전진|(?i:\bforwards?\b|\bahead\b)", [0.0, 0.0, 1.0]),
        (r"뒤|후진|(?i:\bbackwards?\b|\bback\b)", [0.0, 0.0, -1.0]),
        (r"왼쪽|좌측|(?i:\bleft\b)", [-1.0, 0.0, 0.0]),
        (r"오른쪽|우측|(?i:\bright\b)", [1.0, 0.0, 0.0]),
        (r"북쪽|(?i:\bnorth\b)", [0.0, 0.0, 1.0]),
        (r"남쪽|(?i:\bsouth\b)", [0.0, 0.0, -1.0]),
        (r"동쪽|(?i:\beast\b)", [1.0, 0.0, 0.0]),
        (r"서쪽|(?i:\bwest\b)", [-1.0, 0.0, 0.0]),
    ]
    .into_iter()
    .map(|(pattern, direction)| (Regex::new(pattern).unwrap(), direction))
    .collect()
});

/// Parse operator text without the language model.
///
/// `previous` only influences default speeds: move and reconnaissance pick up
/// a sensible speed when neither the text nor the current state has one.
pub fn parse_rules(text: &str, previous: &Command) -> ParsedCommand {
    let mut parsed = ParsedCommand::default();

    let altitude = first_number(&ALTITUDE_UP, text)
        .map(|value| (value, UP))
        .or_else(|| first_number(&ALTITUDE_DOWN, text).map(|value| (value, DOWN)))
        .or_else(|| first_number(&ALTITUDE_ABSOLUTE, text).map(|value| (value, [0.0; 3])));

    let keyword_direction = DIRECTIONS
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, direction)| *direction);

    if let Some((value, direction)) = altitude {
        parsed.action = Some(Action::Altitude);
        parsed.altitude = value;
        parsed.direction = Some(direction);
    } else if let Some(direction) = keyword_direction {
        parsed.action = Some(Action::Move);
        parsed.direction = Some(direction);
    }

    let explicit_speed = first_number(&SPEED, text);
    if let Some(speed) = explicit_speed {
        parsed.speed = speed;
    }

    if ROTATE.is_match(text) {
        let degrees = first_number(&DEGREES, text).unwrap_or(DEFAULT_ROTATION_DEG);
        let sign = match keyword_direction {
            Some([x, _, _]) if x < 0.0 => -1.0,
            _ => 1.0,
        };
        parsed.action = Some(Action::Rotate);
        parsed.direction = Some([0.0, sign * degrees, 0.0]);
    } else if HOVER.is_match(text) {
        parsed.action = Some(Action::Hover);
        parsed.speed = 0.0;
    } else if RETURN.is_match(text) {
        parsed.action = Some(Action::Return);
    } else if RECON.is_match(text) {
        parsed.action = Some(Action::Reconnaissance);
    } else if parsed.action.is_none() && MOVE.is_match(text) {
        parsed.action = Some(Action::Move);
    }

    if TRACK.is_match(text) {
        parsed.action = Some(Action::Tracking);
        parsed.tracking_distance =
            first_number(&DISTANCE, text).unwrap_or(DEFAULT_TRACKING_DISTANCE);
    }

    if explicit_speed.is_none() && previous.speed <= 0.0 {
        match parsed.action {
            Some(Action::Move) => parsed.speed = DEFAULT_MOVE_SPEED,
            Some(Action::Reconnaissance) => parsed.speed = DEFAULT_RECON_SPEED,
            _ => {}
        }
    }

    tracing::debug!(?parsed, "Rule-based parse of {:?}", text);
    parsed
}

/// First numeric capture group that participated in the match.
fn first_number(pattern: &Regex, text: &str) -> Option<f64> {
    let captures = pattern.captures(text)?;
    captures
        .iter()
        .skip(1)
        .flatten()
        .find_map(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedCommand {
        parse_rules(text, &Command::default())
    }

    #[test]
    fn test_relative_altitude_up_korean() {
        let parsed = parse("위로 5미터 상승");
        assert_eq!(parsed.action, Some(Action::Altitude));
        assert_eq!(parsed.altitude, 5.0);
        assert_eq!(parsed.direction, Some(UP));

        let merged = Command::altitude(10.0).merge(&parsed);
        assert_eq!(merged.altitude, 15.0);
    }

    #[test]
    fn test_relative_altitude_down() {
        let parsed = parse("고도 3미터 낮춰");
        assert_eq!(parsed.action, Some(Action::Altitude));
        assert_eq!(parsed.altitude, 3.0);
        assert_eq!(parsed.direction, Some(DOWN));

        let english = parse("descend 2.5 m");
        assert_eq!(english.altitude, 2.5);
        assert_eq!(english.direction, Some(DOWN));
    }

    #[test]
    fn test_absolute_altitude() {
        let parsed = parse("고도 20미터로 유지");
        assert_eq!(parsed.action, Some(Action::Altitude));
        assert_eq!(parsed.altitude, 20.0);
        assert_eq!(parsed.direction, Some([0.0; 3]));

        let merged = Command::altitude(7.0).merge(&parsed);
        assert_eq!(merged.altitude, 20.0);
    }

    #[test]
    fn test_move_direction_gets_default_speed() {
        let parsed = parse("앞으로 이동해");
        assert_eq!(parsed.action, Some(Action::Move));
        assert_eq!(parsed.direction, Some([0.0, 0.0, 1.0]));
        assert_eq!(parsed.speed, DEFAULT_MOVE_SPEED);

        let moving = Command::move_towards([0.0, 0.0, 1.0], 2.0);
        let again = parse_rules("왼쪽으로 가줘", &moving);
        assert_eq!(again.direction, Some([-1.0, 0.0, 0.0]));
        assert_eq!(again.speed, 0.0);
    }

    #[test]
    fn test_explicit_speed() {
        let parsed = parse("오른쪽으로 속도 3으로 이동");
        assert_eq!(parsed.direction, Some([1.0, 0.0, 0.0]));
        assert_eq!(parsed.speed, 3.0);

        let english = parse("fly forward at 4 m/s");
        assert_eq!(english.direction, Some([0.0, 0.0, 1.0]));
        assert_eq!(english.speed, 4.0);
    }

    #[test]
    fn test_speed_only_keeps_action() {
        let parsed = parse("속도 7");
        assert_eq!(parsed.action, None);
        assert_eq!(parsed.speed, 7.0);
    }

    #[test]
    fn test_rotate_with_degrees_and_side() {
        let parsed = parse("왼쪽으로 45도 회전");
        assert_eq!(parsed.action, Some(Action::Rotate));
        assert_eq!(parsed.direction, Some([0.0, -45.0, 0.0]));

        let default = parse("turn right");
        assert_eq!(default.direction, Some([0.0, 90.0, 0.0]));
    }

    #[test]
    fn test_hover_and_return() {
        let hover = parse_rules("제자리에 정지", &Command::move_towards([0.0, 0.0, 1.0], 5.0));
        assert_eq!(hover.action, Some(Action::Hover));
        assert_eq!(hover.speed, 0.0);

        assert_eq!(parse("기지로 복귀해").action, Some(Action::Return));
        assert_eq!(parse("return home").action, Some(Action::Return));
    }

    #[test]
    fn test_reconnaissance_default_speed() {
        let parsed = parse("주변 정찰 시작");
        assert_eq!(parsed.action, Some(Action::Reconnaissance));
        assert_eq!(parsed.speed, DEFAULT_RECON_SPEED);
    }

    #[test]
    fn test_tracking_distance() {
        let parsed = parse("저 사람을 3미터 거리에서 추적해");
        assert_eq!(parsed.action, Some(Action::Tracking));
        assert_eq!(parsed.tracking_distance, 3.0);

        let default = parse("follow the target");
        assert_eq!(default.action, Some(Action::Tracking));
        assert_eq!(default.tracking_distance, DEFAULT_TRACKING_DISTANCE);
    }

    #[test]
    fn test_unrecognized_text_is_empty() {
        assert_eq!(parse("안녕하세요"), ParsedCommand::default());
    }
}
