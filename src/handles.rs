use crate::model::{Position, RelationshipKind};
use crate::snapshot::HandleBinding;

/// Connection points on a component node. Four sides, with the left and
/// right sides split into paired source/target points so bidirectional
/// communication between two nodes never shares an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHandle {
    Top,
    TopSource,
    Bottom,
    BottomSource,
    RightTop,
    RightTopTarget,
    RightBottom,
    RightBottomTarget,
    LeftTop,
    LeftTopSource,
    LeftBottom,
    LeftBottomSource,
}

impl ComponentHandle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::TopSource => "top-source",
            Self::Bottom => "bottom",
            Self::BottomSource => "bottom-source",
            Self::RightTop => "right-top",
            Self::RightTopTarget => "right-top-target",
            Self::RightBottom => "right-bottom",
            Self::RightBottomTarget => "right-bottom-target",
            Self::LeftTop => "left-top",
            Self::LeftTopSource => "left-top-source",
            Self::LeftBottom => "left-bottom",
            Self::LeftBottomSource => "left-bottom-source",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Some(match id {
            "top" => Self::Top,
            "top-source" => Self::TopSource,
            "bottom" => Self::Bottom,
            "bottom-source" => Self::BottomSource,
            "right-top" => Self::RightTop,
            "right-top-target" => Self::RightTopTarget,
            "right-bottom" => Self::RightBottom,
            "right-bottom-target" => Self::RightBottomTarget,
            "left-top" => Self::LeftTop,
            "left-top-source" => Self::LeftTopSource,
            "left-bottom" => Self::LeftBottom,
            "left-bottom-source" => Self::LeftBottomSource,
            _ => return None,
        })
    }
}

/// The simpler two-per-side scheme used by artifact relationship graphs,
/// where edges are user-drawn and reconnection is free-form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphHandle {
    TopTarget,
    TopSource,
    RightSource,
    RightTarget,
    BottomSource,
    BottomTarget,
    LeftTarget,
    LeftSource,
}

impl GraphHandle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopTarget => "top-target",
            Self::TopSource => "top-source",
            Self::RightSource => "right-source",
            Self::RightTarget => "right-target",
            Self::BottomSource => "bottom-source",
            Self::BottomTarget => "bottom-target",
            Self::LeftTarget => "left-target",
            Self::LeftSource => "left-source",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Some(match id {
            "top-target" => Self::TopTarget,
            "top-source" => Self::TopSource,
            "right-source" => Self::RightSource,
            "right-target" => Self::RightTarget,
            "bottom-source" => Self::BottomSource,
            "bottom-target" => Self::BottomTarget,
            "left-target" => Self::LeftTarget,
            "left-source" => Self::LeftSource,
            _ => return None,
        })
    }
}

fn binding(source: ComponentHandle, target: ComponentHandle) -> HandleBinding {
    HandleBinding::new(source.as_str(), target.as_str())
}

/// Pick the source/target handles for one edge.
///
/// A saved binding always wins over the rules, whatever the node
/// positions. Otherwise structural edges read top-to-bottom by
/// convention, and communication edges route along the upper lane when
/// flowing left-to-right and along the lower lane on the way back, so a
/// bidirectional pair never overlaps.
pub fn assign_handles(
    kind: RelationshipKind,
    source: Option<Position>,
    target: Option<Position>,
    saved: Option<&HandleBinding>,
) -> HandleBinding {
    if let Some(saved) = saved {
        if !saved.is_empty() {
            // Either side may be null on the wire; the missing side gets
            // the structural default, like the stored rows do.
            return HandleBinding {
                source_handle: saved
                    .source_handle
                    .clone()
                    .or_else(|| Some(ComponentHandle::BottomSource.as_str().to_string())),
                target_handle: saved
                    .target_handle
                    .clone()
                    .or_else(|| Some(ComponentHandle::Top.as_str().to_string())),
            };
        }
    }

    match kind {
        RelationshipKind::Structural => {
            binding(ComponentHandle::BottomSource, ComponentHandle::Top)
        }
        RelationshipKind::Communication => match (source, target) {
            (Some(source), Some(target)) if source.x >= target.x => binding(
                ComponentHandle::LeftBottomSource,
                ComponentHandle::RightBottomTarget,
            ),
            // Forward flow, and the fallback while layout is pending.
            _ => binding(ComponentHandle::RightTop, ComponentHandle::LeftTop),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_flow_uses_upper_lane() {
        let assigned = assign_handles(
            RelationshipKind::Communication,
            Some(Position::new(0.0, 0.0)),
            Some(Position::new(200.0, 0.0)),
            None,
        );
        assert_eq!(assigned, HandleBinding::new("right-top", "left-top"));
    }

    #[test]
    fn reverse_flow_uses_lower_lane() {
        let assigned = assign_handles(
            RelationshipKind::Communication,
            Some(Position::new(300.0, 0.0)),
            Some(Position::new(100.0, 0.0)),
            None,
        );
        assert_eq!(
            assigned,
            HandleBinding::new("left-bottom-source", "right-bottom-target")
        );
    }

    #[test]
    fn swapping_x_flips_the_lane() {
        let a = Position::new(40.0, 10.0);
        let b = Position::new(500.0, 90.0);
        let forward = assign_handles(RelationshipKind::Communication, Some(a), Some(b), None);
        let reverse = assign_handles(RelationshipKind::Communication, Some(b), Some(a), None);
        assert_eq!(forward, HandleBinding::new("right-top", "left-top"));
        assert_eq!(
            reverse,
            HandleBinding::new("left-bottom-source", "right-bottom-target")
        );
    }

    #[test]
    fn vertically_stacked_nodes_take_the_lower_lane() {
        // Equal x counts as reverse flow; only a strictly-left source
        // reads as forward.
        let assigned = assign_handles(
            RelationshipKind::Communication,
            Some(Position::new(100.0, 0.0)),
            Some(Position::new(100.0, 300.0)),
            None,
        );
        assert_eq!(
            assigned,
            HandleBinding::new("left-bottom-source", "right-bottom-target")
        );
    }

    #[test]
    fn unresolved_positions_default_forward() {
        let assigned = assign_handles(RelationshipKind::Communication, None, None, None);
        assert_eq!(assigned, HandleBinding::new("right-top", "left-top"));

        let assigned = assign_handles(
            RelationshipKind::Communication,
            Some(Position::new(900.0, 0.0)),
            None,
            None,
        );
        assert_eq!(assigned, HandleBinding::new("right-top", "left-top"));
    }

    #[test]
    fn structural_edges_read_top_to_bottom() {
        for (source, target) in [
            (Position::new(0.0, 0.0), Position::new(500.0, 0.0)),
            (Position::new(500.0, 0.0), Position::new(0.0, 0.0)),
        ] {
            let assigned = assign_handles(
                RelationshipKind::Structural,
                Some(source),
                Some(target),
                None,
            );
            assert_eq!(assigned, HandleBinding::new("bottom-source", "top"));
        }
    }

    #[test]
    fn saved_binding_always_wins() {
        let saved = HandleBinding::new("left-top-source", "right-bottom-target");
        for kind in [RelationshipKind::Structural, RelationshipKind::Communication] {
            let assigned = assign_handles(
                kind,
                Some(Position::new(0.0, 0.0)),
                Some(Position::new(999.0, 0.0)),
                Some(&saved),
            );
            assert_eq!(assigned, saved);
        }
    }

    #[test]
    fn half_saved_binding_fills_the_structural_default() {
        let saved = HandleBinding {
            source_handle: Some("right-bottom".to_string()),
            target_handle: None,
        };
        let assigned = assign_handles(RelationshipKind::Communication, None, None, Some(&saved));
        assert_eq!(assigned, HandleBinding::new("right-bottom", "top"));
    }

    #[test]
    fn empty_saved_binding_is_ignored() {
        let saved = HandleBinding::default();
        let assigned = assign_handles(
            RelationshipKind::Communication,
            Some(Position::new(0.0, 0.0)),
            Some(Position::new(10.0, 0.0)),
            Some(&saved),
        );
        assert_eq!(assigned, HandleBinding::new("right-top", "left-top"));
    }

    #[test]
    fn handle_ids_round_trip() {
        for handle in [
            ComponentHandle::Top,
            ComponentHandle::TopSource,
            ComponentHandle::Bottom,
            ComponentHandle::BottomSource,
            ComponentHandle::RightTop,
            ComponentHandle::RightTopTarget,
            ComponentHandle::RightBottom,
            ComponentHandle::RightBottomTarget,
            ComponentHandle::LeftTop,
            ComponentHandle::LeftTopSource,
            ComponentHandle::LeftBottom,
            ComponentHandle::LeftBottomSource,
        ] {
            assert_eq!(ComponentHandle::parse(handle.as_str()), Some(handle));
        }
        for handle in [
            GraphHandle::TopTarget,
            GraphHandle::TopSource,
            GraphHandle::RightSource,
            GraphHandle::RightTarget,
            GraphHandle::BottomSource,
            GraphHandle::BottomTarget,
            GraphHandle::LeftTarget,
            GraphHandle::LeftSource,
        ] {
            assert_eq!(GraphHandle::parse(handle.as_str()), Some(handle));
        }
        assert_eq!(ComponentHandle::parse("middle"), None);
        assert_eq!(GraphHandle::parse("middle"), None);
    }
}
