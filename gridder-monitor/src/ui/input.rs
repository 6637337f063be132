/// Key bindings for the control panel
///
/// | Key            | Action                              |
/// |----------------|-------------------------------------|
/// | `b` / `B`      | next / previous bot (incl. All Bots)|
/// | `r` / `R`      | next / previous run                 |
/// | `a`            | toggle all runs                     |
/// | `t`            | cycle time filter                   |
/// | `+` / `-`      | refresh rate up / down              |
/// | `p`            | pause / resume auto-refresh         |
/// | `Space` / `F5` | refresh now                         |
/// | `q` / `Esc`    | quit                                |

use crossterm::event::KeyCode;

use crate::selection::{
    ControlEvent, Controls, MAX_REFRESH_SECS, MIN_REFRESH_SECS, REFRESH_STEP_SECS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Control(ControlEvent),
    Quit,
}

/// Translate a key press into an action given the current controls.
/// Returns `None` for unbound keys and for controls that are currently unusable.
pub fn map_key(code: KeyCode, controls: &Controls) -> Option<KeyAction> {
    let event = match code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(KeyAction::Quit),
        KeyCode::Char('b') => cycle_bot(controls, true)?,
        KeyCode::Char('B') => cycle_bot(controls, false)?,
        KeyCode::Char('r') => cycle_run(controls, true)?,
        KeyCode::Char('R') => cycle_run(controls, false)?,
        KeyCode::Char('a') => {
            ControlEvent::SetIncludeAllRuns(!controls.selection.include_all_runs)
        }
        KeyCode::Char('t') => ControlEvent::SetTimeFilter(controls.selection.time_filter.next()),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let current = controls.refresh.interval_secs;
            if current >= MAX_REFRESH_SECS {
                return None;
            }
            ControlEvent::SetRefreshRate(current + REFRESH_STEP_SECS)
        }
        KeyCode::Char('-') => {
            let current = controls.refresh.interval_secs;
            if current <= MIN_REFRESH_SECS {
                return None;
            }
            ControlEvent::SetRefreshRate(current.saturating_sub(REFRESH_STEP_SECS))
        }
        KeyCode::Char('p') => ControlEvent::SetAutoRefresh(!controls.refresh.enabled),
        KeyCode::Char(' ') | KeyCode::F(5) => ControlEvent::RefreshNow,
        _ => return None,
    };

    Some(KeyAction::Control(event))
}

/// Bot options are All Bots (empty name) followed by the catalog.
fn cycle_bot(controls: &Controls, forward: bool) -> Option<ControlEvent> {
    if controls.bots.is_empty() {
        return None;
    }

    let mut options = Vec::with_capacity(controls.bots.len() + 1);
    options.push(String::new());
    options.extend(controls.bots.iter().cloned());

    let next = cycle(&options, &controls.selection.bot_name, forward)?;
    Some(ControlEvent::SetBotName(next.clone()))
}

fn cycle_run(controls: &Controls, forward: bool) -> Option<ControlEvent> {
    if !controls.run_selector_enabled() {
        return None;
    }

    let runs: Vec<String> = controls
        .runs
        .runs()
        .iter()
        .map(|run| run.bot_run.clone())
        .collect();

    let next = cycle(&runs, &controls.selection.bot_run, forward)?;
    Some(ControlEvent::SetBotRun(next.clone()))
}

/// Neighbour of `current` in `options`, wrapping. Unknown `current` starts at
/// the first (forward) or last (backward) option.
fn cycle<'a>(options: &'a [String], current: &str, forward: bool) -> Option<&'a String> {
    let len = options.len();
    if len == 0 {
        return None;
    }

    let index = match options.iter().position(|option| option == current) {
        Some(index) if forward => (index + 1) % len,
        Some(index) => (index + len - 1) % len,
        None if forward => 0,
        None => len - 1,
    };
    options.get(index)
}
