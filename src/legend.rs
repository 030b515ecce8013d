use serde::Serialize;

use super::error::{Result,Error};
use super::rate::RateTable;


pub const COLORS: [&str; 9] = [
    "darkred", "red", "darkkhaki", "lime", "green", "deepskyblue", "blue", "violet", "black"
];

pub const LINE_STYLES: [LineStyle; 4] = [
    LineStyle::Solid, LineStyle::Dashed, LineStyle::DashDot, LineStyle::Dotted
];


#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    DashDot,
    Dotted,
}

impl LineStyle {
    /// Stroke dash pattern, alternating dash and gap lengths in pixels.
    pub fn dash(&self) -> &'static [u32] {
	match self {
	    Self::Solid => &[],
	    Self::Dashed => &[8, 4],
	    Self::DashDot => &[8, 4, 2, 4],
	    Self::Dotted => &[2, 3],
	}
    }
}


#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct SeriesStyle {
    pub color: &'static str,
    pub line: LineStyle,
}

/// Style of the `index`th series. Each color is used with every line
/// style before moving on to the next color.
pub fn series_style(index: usize) -> SeriesStyle {
    SeriesStyle {
	color: COLORS[(index / LINE_STYLES.len()) % COLORS.len()],
	line: LINE_STYLES[index % LINE_STYLES.len()],
    }
}


#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn toggled(self) -> Self {
	match self {
	    Self::Visible => Self::Hidden,
	    Self::Hidden => Self::Visible,
	}
    }
}


/// How an action changes the entries it reaches.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Flip,
    Show,
    Hide,
}

impl Transition {
    pub fn next(self, current: Visibility) -> Visibility {
	match self {
	    Self::Flip => current.toggled(),
	    Self::Show => Visibility::Visible,
	    Self::Hide => Visibility::Hidden,
	}
    }
}


#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub const ALL: [MouseButton; 3] = [Self::Left, Self::Middle, Self::Right];

    /// `MouseEvent.button` in the browser.
    pub fn code(&self) -> u8 {
	match self {
	    Self::Left => 0,
	    Self::Middle => 1,
	    Self::Right => 2,
	}
    }
}


#[derive(Clone,Debug,PartialEq,Eq)]
pub enum LegendAction {
    Toggle(String),
    HideAll,
    ShowAll,
}

impl LegendAction {

    /// Maps a click to an action. Left clicks only act on a legend entry;
    /// right and middle clicks act anywhere.
    pub fn from_click(button: MouseButton, entry: Option<&str>) -> Option<Self> {
	match (button, entry) {
	    (MouseButton::Left, Some(region)) => Some(Self::Toggle(region.to_string())),
	    (MouseButton::Left, None) => None,
	    (MouseButton::Middle, _) => Some(Self::ShowAll),
	    (MouseButton::Right, _) => Some(Self::HideAll),
	}
    }

    pub fn name(&self) -> &'static str {
	match self {
	    Self::Toggle(_) => "toggle",
	    Self::HideAll => "hide-all",
	    Self::ShowAll => "show-all",
	}
    }

    pub fn label(&self) -> &'static str {
	match self {
	    Self::Toggle(_) => "Toggle",
	    Self::HideAll => "Hide all",
	    Self::ShowAll => "Show all",
	}
    }

    pub fn transition(&self) -> Transition {
	match self {
	    Self::Toggle(_) => Transition::Flip,
	    Self::HideAll => Transition::Hide,
	    Self::ShowAll => Transition::Show,
	}
    }

    fn applies_to(&self, region: &str) -> bool {
	match self {
	    Self::Toggle(target) => target == region,
	    Self::HideAll | Self::ShowAll => true,
	}
    }

}


/// Row of the table the browser script dispatches legend actions through.
#[derive(Clone,Debug,PartialEq,Eq,Serialize)]
pub struct Dispatch {
    pub action: &'static str,
    pub label: &'static str,
    /// Acts on the clicked entry only.
    pub single: bool,
    pub transition: Transition,
}

pub fn dispatch_table() -> Vec<Dispatch> {
    let kinds = [LegendAction::Toggle(String::new()), LegendAction::HideAll, LegendAction::ShowAll];
    kinds.iter().map(|action| Dispatch {
	action: action.name(),
	label: action.label(),
	single: matches!(action, LegendAction::Toggle(_)),
	transition: action.transition(),
    }).collect()
}


/// Action names a mouse button triggers on a legend entry and elsewhere.
#[derive(Clone,Debug,PartialEq,Eq,Serialize)]
pub struct ClickBinding {
    pub button: u8,
    pub on_entry: Option<&'static str>,
    pub elsewhere: Option<&'static str>,
}

pub fn click_bindings() -> Vec<ClickBinding> {
    MouseButton::ALL.iter().map(|button| ClickBinding {
	button: button.code(),
	on_entry: LegendAction::from_click(*button, Some("")).map(|a| a.name()),
	elsewhere: LegendAction::from_click(*button, None).map(|a| a.name()),
    }).collect()
}


#[derive(Clone,Debug,PartialEq)]
pub struct LegendEntry {
    pub region: String,
    pub style: SeriesStyle,
    pub points: usize,
    pub visibility: Visibility,
}


/// Display state of the series in a rate graph. Changing it never touches
/// the rate data.
#[derive(Clone,Debug,PartialEq)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {

    pub fn new(table: &RateTable) -> Self {
	Self {
	    entries: table.iter().enumerate().map(|(i,(region,series))| LegendEntry {
		region: region.to_string(),
		style: series_style(i),
		points: series.len(),
		visibility: Visibility::Visible,
	    }).collect()
	}
    }

    pub fn entries(&self) -> &[LegendEntry] {
	&self.entries
    }

    pub fn entry(&self, region: &str) -> Option<&LegendEntry> {
	self.entries.iter().find(|e| e.region == region)
    }

    pub fn is_visible(&self, region: &str) -> bool {
	self.entry(region).map_or(false, |e| e.visibility == Visibility::Visible)
    }

    pub fn visible(&self) -> impl Iterator<Item = &str> {
	self.with(Visibility::Visible)
    }

    pub fn hidden(&self) -> impl Iterator<Item = &str> {
	self.with(Visibility::Hidden)
    }

    fn with(&self, visibility: Visibility) -> impl Iterator<Item = &str> {
	self.entries.iter().filter(move |e| e.visibility == visibility)
	    .map(|e| e.region.as_str())
    }

    /// Applies one action. Toggling an entry without rate points does
    /// nothing; toggling an unknown region is an error.
    pub fn apply(&mut self, action: &LegendAction) -> Result<()> {
	if let LegendAction::Toggle(region) = action {
	    match self.entry(region) {
		None => return Err(Error::MissingRegion(region.clone())),
		Some(entry) if entry.points == 0 => return Ok(()),
		Some(_) => {}
	    }
	}
	for entry in self.entries.iter_mut().filter(|e| action.applies_to(&e.region)) {
	    entry.visibility = action.transition().next(entry.visibility);
	}
	Ok(())
    }

}
