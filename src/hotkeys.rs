// src/hotkeys.rs
use crate::types::{ControlCommand, SegmentKind};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OperatorAction {
    Command(ControlCommand),
    Quit,
}

/// Operator keyboard mapping. Owns the trial counter; the gate itself
/// never validates trial numbers.
///
/// `c` starts a REST trial, `v` a TASK trial, `b` ends the current one,
/// `q` quits.
#[derive(Clone, Debug, Default)]
pub struct OperatorKeys {
    trial: u32,
}

impl OperatorKeys {
    pub fn trial(&self) -> u32 {
        self.trial
    }

    pub fn press(&mut self, key: char) -> Option<OperatorAction> {
        let command = match key.to_ascii_lowercase() {
            'c' => self.start(SegmentKind::Rest),
            'v' => self.start(SegmentKind::Task),
            'b' => ControlCommand::EndSegment { trial: self.trial },
            'q' => return Some(OperatorAction::Quit),
            _ => return None,
        };
        Some(OperatorAction::Command(command))
    }

    fn start(&mut self, kind: SegmentKind) -> ControlCommand {
        self.trial += 1;
        ControlCommand::StartSegment {
            trial: self.trial,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_bump_trial_and_end_reuses_it() {
        let mut keys = OperatorKeys::default();
        assert_eq!(
            keys.press('c'),
            Some(OperatorAction::Command(ControlCommand::StartSegment {
                trial: 1,
                kind: SegmentKind::Rest
            }))
        );
        assert_eq!(
            keys.press('b'),
            Some(OperatorAction::Command(ControlCommand::EndSegment { trial: 1 }))
        );
        assert_eq!(
            keys.press('V'),
            Some(OperatorAction::Command(ControlCommand::StartSegment {
                trial: 2,
                kind: SegmentKind::Task
            }))
        );
        assert_eq!(keys.trial(), 2);
    }

    #[test]
    fn other_keys() {
        let mut keys = OperatorKeys::default();
        assert_eq!(keys.press('q'), Some(OperatorAction::Quit));
        assert_eq!(keys.press('x'), None);
        assert_eq!(keys.trial(), 0);
    }
}
