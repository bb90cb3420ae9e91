/// Reusable UI components

use yew::prelude::*;
use crate::competition::{CompetitionLevel, SoftresDetails};

#[derive(Properties, PartialEq)]
pub struct CompetitionBadgeProps {
    pub count: u32,
}

/// Colored low/medium/high tag for a competition count
#[function_component(CompetitionBadge)]
pub fn competition_badge(props: &CompetitionBadgeProps) -> Html {
    let level = CompetitionLevel::from_count(props.count);

    html! {
        <span class={classes!("bis-item-competition", level.css_class())}>
            {level.label()}
        </span>
    }
}

#[derive(Properties, PartialEq)]
pub struct ReserveCountProps {
    pub details: SoftresDetails,
}

/// "N competition (+M yours)" or "N soft reserves" when the user holds none
#[function_component(ReserveCount)]
pub fn reserve_count(props: &ReserveCountProps) -> Html {
    let details = &props.details;

    if details.your_count > 0 {
        html! {
            <span class="bis-item-count">
                {format!("{} competition ", details.competition_count)}
                <span class="your-reserves">{format!("+{} yours", details.your_count)}</span>
            </span>
        }
    } else {
        html! {
            <span class="bis-item-count">
                {format!("{} soft reserves", details.competition_count)}
            </span>
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct EmptyStateProps {
    pub message: AttrValue,
}

#[function_component(EmptyState)]
pub fn empty_state(props: &EmptyStateProps) -> Html {
    html! {
        <p class="empty-state">{props.message.clone()}</p>
    }
}

#[cfg(test)]
mod tests {
    use crate::competition::CompetitionLevel;

    #[test]
    fn test_badge_css_classes() {
        assert_eq!(CompetitionLevel::from_count(1).css_class(), "competition-low");
        assert_eq!(
            CompetitionLevel::from_count(4).css_class(),
            "competition-medium"
        );
        assert_eq!(
            CompetitionLevel::from_count(9).css_class(),
            "competition-high"
        );
    }
}
