//! Keysym and modifier model.
//!
//! Keysyms follow the X11 keyval space: printable Latin-1 characters are
//! their own keyval, other Unicode characters are `codepoint | 0x0100_0000`,
//! and function/dead/keypad keys live in the `0xfe00`..`0xffff` range. The
//! engine never talks to a real keyboard directly; hosts hand it `KeyEvent`s
//! already carrying keyvals.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// A single keysym (X11 keyval).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keysym(pub u32);

const UNICODE_KEYSYM_FLAG: u32 = 0x0100_0000;

// Editing / motion keys.
pub const KEY_BACKSPACE: Keysym = Keysym(0xff08);
pub const KEY_TAB: Keysym = Keysym(0xff09);
pub const KEY_RETURN: Keysym = Keysym(0xff0d);
pub const KEY_ESCAPE: Keysym = Keysym(0xff1b);
pub const KEY_HOME: Keysym = Keysym(0xff50);
pub const KEY_LEFT: Keysym = Keysym(0xff51);
pub const KEY_UP: Keysym = Keysym(0xff52);
pub const KEY_RIGHT: Keysym = Keysym(0xff53);
pub const KEY_DOWN: Keysym = Keysym(0xff54);
pub const KEY_PAGE_UP: Keysym = Keysym(0xff55);
pub const KEY_PAGE_DOWN: Keysym = Keysym(0xff56);
pub const KEY_END: Keysym = Keysym(0xff57);
pub const KEY_DELETE: Keysym = Keysym(0xffff);

// Modifier keys.
pub const KEY_SHIFT_L: Keysym = Keysym(0xffe1);
pub const KEY_SHIFT_R: Keysym = Keysym(0xffe2);
pub const KEY_CONTROL_L: Keysym = Keysym(0xffe3);
pub const KEY_CONTROL_R: Keysym = Keysym(0xffe4);
pub const KEY_ALT_L: Keysym = Keysym(0xffe9);
pub const KEY_ISO_LEVEL3_SHIFT: Keysym = Keysym(0xfe03);

/// The compose key.
pub const KEY_MULTI: Keysym = Keysym(0xff20);

// Keypad keys.
pub const KEY_KP_SPACE: Keysym = Keysym(0xff80);
pub const KEY_KP_ENTER: Keysym = Keysym(0xff8d);
pub const KEY_KP_MULTIPLY: Keysym = Keysym(0xffaa);
pub const KEY_KP_ADD: Keysym = Keysym(0xffab);
pub const KEY_KP_SUBTRACT: Keysym = Keysym(0xffad);
pub const KEY_KP_DECIMAL: Keysym = Keysym(0xffae);
pub const KEY_KP_DIVIDE: Keysym = Keysym(0xffaf);
pub const KEY_KP_0: Keysym = Keysym(0xffb0);
pub const KEY_KP_9: Keysym = Keysym(0xffb9);
pub const KEY_KP_EQUAL: Keysym = Keysym(0xffbd);

// Dead keys (0xfe50..0xfe6f plus dead_greek).
pub const KEY_DEAD_GRAVE: Keysym = Keysym(0xfe50);
pub const KEY_DEAD_ACUTE: Keysym = Keysym(0xfe51);
pub const KEY_DEAD_CIRCUMFLEX: Keysym = Keysym(0xfe52);
pub const KEY_DEAD_TILDE: Keysym = Keysym(0xfe53);
pub const KEY_DEAD_MACRON: Keysym = Keysym(0xfe54);
pub const KEY_DEAD_BREVE: Keysym = Keysym(0xfe55);
pub const KEY_DEAD_ABOVEDOT: Keysym = Keysym(0xfe56);
pub const KEY_DEAD_DIAERESIS: Keysym = Keysym(0xfe57);
pub const KEY_DEAD_ABOVERING: Keysym = Keysym(0xfe58);
pub const KEY_DEAD_DOUBLEACUTE: Keysym = Keysym(0xfe59);
pub const KEY_DEAD_CARON: Keysym = Keysym(0xfe5a);
pub const KEY_DEAD_CEDILLA: Keysym = Keysym(0xfe5b);
pub const KEY_DEAD_OGONEK: Keysym = Keysym(0xfe5c);
pub const KEY_DEAD_IOTA: Keysym = Keysym(0xfe5d);
pub const KEY_DEAD_BELOWDOT: Keysym = Keysym(0xfe60);
pub const KEY_DEAD_HOOK: Keysym = Keysym(0xfe61);
pub const KEY_DEAD_HORN: Keysym = Keysym(0xfe62);
pub const KEY_DEAD_STROKE: Keysym = Keysym(0xfe63);
pub const KEY_DEAD_ABOVECOMMA: Keysym = Keysym(0xfe64);
pub const KEY_DEAD_ABOVEREVERSEDCOMMA: Keysym = Keysym(0xfe65);
pub const KEY_DEAD_DOUBLEGRAVE: Keysym = Keysym(0xfe66);
pub const KEY_DEAD_BELOWRING: Keysym = Keysym(0xfe67);
pub const KEY_DEAD_BELOWMACRON: Keysym = Keysym(0xfe68);
pub const KEY_DEAD_BELOWCIRCUMFLEX: Keysym = Keysym(0xfe69);
pub const KEY_DEAD_BELOWTILDE: Keysym = Keysym(0xfe6a);
pub const KEY_DEAD_BELOWBREVE: Keysym = Keysym(0xfe6b);
pub const KEY_DEAD_BELOWDIAERESIS: Keysym = Keysym(0xfe6c);
pub const KEY_DEAD_INVERTEDBREVE: Keysym = Keysym(0xfe6d);
pub const KEY_DEAD_BELOWCOMMA: Keysym = Keysym(0xfe6e);
pub const KEY_DEAD_CURRENCY: Keysym = Keysym(0xfe6f);
pub const KEY_DEAD_GREEK: Keysym = Keysym(0xfe8c);

/// Dead key → combining mark. Order matters to the compose fallback: marks
/// are applied in reverse typing order before NFC normalization.
static DEAD_KEY_COMBINING: Lazy<HashMap<Keysym, char>> = Lazy::new(|| {
    HashMap::from([
        (KEY_DEAD_GRAVE, '\u{0300}'),
        (KEY_DEAD_ACUTE, '\u{0301}'),
        (KEY_DEAD_CIRCUMFLEX, '\u{0302}'),
        (KEY_DEAD_TILDE, '\u{0303}'),
        (KEY_DEAD_MACRON, '\u{0304}'),
        (KEY_DEAD_BREVE, '\u{0306}'),
        (KEY_DEAD_ABOVEDOT, '\u{0307}'),
        (KEY_DEAD_DIAERESIS, '\u{0308}'),
        (KEY_DEAD_ABOVERING, '\u{030A}'),
        (KEY_DEAD_DOUBLEACUTE, '\u{030B}'),
        (KEY_DEAD_CARON, '\u{030C}'),
        (KEY_DEAD_CEDILLA, '\u{0327}'),
        (KEY_DEAD_OGONEK, '\u{0328}'),
        (KEY_DEAD_IOTA, '\u{0345}'),
        (KEY_DEAD_BELOWDOT, '\u{0323}'),
        (KEY_DEAD_HOOK, '\u{0309}'),
        (KEY_DEAD_HORN, '\u{031B}'),
        (KEY_DEAD_STROKE, '\u{0338}'),
        (KEY_DEAD_ABOVECOMMA, '\u{0313}'),
        (KEY_DEAD_ABOVEREVERSEDCOMMA, '\u{0314}'),
        (KEY_DEAD_DOUBLEGRAVE, '\u{030F}'),
        (KEY_DEAD_BELOWRING, '\u{0325}'),
        (KEY_DEAD_BELOWMACRON, '\u{0331}'),
        (KEY_DEAD_BELOWCIRCUMFLEX, '\u{032D}'),
        (KEY_DEAD_BELOWTILDE, '\u{0330}'),
        (KEY_DEAD_BELOWBREVE, '\u{032E}'),
        (KEY_DEAD_BELOWDIAERESIS, '\u{0324}'),
        (KEY_DEAD_INVERTEDBREVE, '\u{0311}'),
        (KEY_DEAD_BELOWCOMMA, '\u{0326}'),
    ])
});

/// Keypad keysym → the plain keysym a compose sequence would use instead.
static KEYPAD_TO_PLAIN: Lazy<HashMap<Keysym, Keysym>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for digit in 0..=9u32 {
        map.insert(Keysym(KEY_KP_0.0 + digit), Keysym('0' as u32 + digit));
    }
    map.insert(KEY_KP_SPACE, Keysym(' ' as u32));
    map.insert(KEY_KP_ENTER, KEY_RETURN);
    map.insert(KEY_KP_MULTIPLY, Keysym('*' as u32));
    map.insert(KEY_KP_ADD, Keysym('+' as u32));
    map.insert(KEY_KP_SUBTRACT, Keysym('-' as u32));
    map.insert(KEY_KP_DECIMAL, Keysym('.' as u32));
    map.insert(KEY_KP_DIVIDE, Keysym('/' as u32));
    map.insert(KEY_KP_EQUAL, Keysym('=' as u32));
    map
});

static PLAIN_TO_KEYPAD: Lazy<HashMap<Keysym, Keysym>> =
    Lazy::new(|| KEYPAD_TO_PLAIN.iter().map(|(k, v)| (*v, *k)).collect());

/// Symbolic names for keysyms that are not plain characters, plus the
/// punctuation names X11 Compose files use (`<minus>`, `<quotedbl>`, ...).
static NAMED_KEYSYMS: Lazy<HashMap<&'static str, Keysym>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, Keysym> = HashMap::from([
        ("BackSpace", KEY_BACKSPACE),
        ("Tab", KEY_TAB),
        ("Return", KEY_RETURN),
        ("Escape", KEY_ESCAPE),
        ("Delete", KEY_DELETE),
        ("Home", KEY_HOME),
        ("End", KEY_END),
        ("Left", KEY_LEFT),
        ("Up", KEY_UP),
        ("Right", KEY_RIGHT),
        ("Down", KEY_DOWN),
        ("Page_Up", KEY_PAGE_UP),
        ("Page_Down", KEY_PAGE_DOWN),
        ("Shift_L", KEY_SHIFT_L),
        ("Shift_R", KEY_SHIFT_R),
        ("Control_L", KEY_CONTROL_L),
        ("Control_R", KEY_CONTROL_R),
        ("Alt_L", KEY_ALT_L),
        ("ISO_Level3_Shift", KEY_ISO_LEVEL3_SHIFT),
        ("Multi_key", KEY_MULTI),
        ("KP_Space", KEY_KP_SPACE),
        ("KP_Enter", KEY_KP_ENTER),
        ("KP_Multiply", KEY_KP_MULTIPLY),
        ("KP_Add", KEY_KP_ADD),
        ("KP_Subtract", KEY_KP_SUBTRACT),
        ("KP_Decimal", KEY_KP_DECIMAL),
        ("KP_Divide", KEY_KP_DIVIDE),
        ("KP_Equal", KEY_KP_EQUAL),
        ("dead_grave", KEY_DEAD_GRAVE),
        ("dead_acute", KEY_DEAD_ACUTE),
        ("dead_circumflex", KEY_DEAD_CIRCUMFLEX),
        ("dead_tilde", KEY_DEAD_TILDE),
        ("dead_macron", KEY_DEAD_MACRON),
        ("dead_breve", KEY_DEAD_BREVE),
        ("dead_abovedot", KEY_DEAD_ABOVEDOT),
        ("dead_diaeresis", KEY_DEAD_DIAERESIS),
        ("dead_abovering", KEY_DEAD_ABOVERING),
        ("dead_doubleacute", KEY_DEAD_DOUBLEACUTE),
        ("dead_caron", KEY_DEAD_CARON),
        ("dead_cedilla", KEY_DEAD_CEDILLA),
        ("dead_ogonek", KEY_DEAD_OGONEK),
        ("dead_iota", KEY_DEAD_IOTA),
        ("dead_belowdot", KEY_DEAD_BELOWDOT),
        ("dead_hook", KEY_DEAD_HOOK),
        ("dead_horn", KEY_DEAD_HORN),
        ("dead_stroke", KEY_DEAD_STROKE),
        ("dead_abovecomma", KEY_DEAD_ABOVECOMMA),
        ("dead_abovereversedcomma", KEY_DEAD_ABOVEREVERSEDCOMMA),
        ("dead_doublegrave", KEY_DEAD_DOUBLEGRAVE),
        ("dead_belowring", KEY_DEAD_BELOWRING),
        ("dead_belowmacron", KEY_DEAD_BELOWMACRON),
        ("dead_belowcircumflex", KEY_DEAD_BELOWCIRCUMFLEX),
        ("dead_belowtilde", KEY_DEAD_BELOWTILDE),
        ("dead_belowbreve", KEY_DEAD_BELOWBREVE),
        ("dead_belowdiaeresis", KEY_DEAD_BELOWDIAERESIS),
        ("dead_invertedbreve", KEY_DEAD_INVERTEDBREVE),
        ("dead_belowcomma", KEY_DEAD_BELOWCOMMA),
        ("dead_currency", KEY_DEAD_CURRENCY),
        ("dead_greek", KEY_DEAD_GREEK),
        ("space", Keysym(' ' as u32)),
        ("exclam", Keysym('!' as u32)),
        ("quotedbl", Keysym('"' as u32)),
        ("numbersign", Keysym('#' as u32)),
        ("dollar", Keysym('$' as u32)),
        ("percent", Keysym('%' as u32)),
        ("ampersand", Keysym('&' as u32)),
        ("apostrophe", Keysym('\'' as u32)),
        ("parenleft", Keysym('(' as u32)),
        ("parenright", Keysym(')' as u32)),
        ("asterisk", Keysym('*' as u32)),
        ("plus", Keysym('+' as u32)),
        ("comma", Keysym(',' as u32)),
        ("minus", Keysym('-' as u32)),
        ("period", Keysym('.' as u32)),
        ("slash", Keysym('/' as u32)),
        ("colon", Keysym(':' as u32)),
        ("semicolon", Keysym(';' as u32)),
        ("less", Keysym('<' as u32)),
        ("equal", Keysym('=' as u32)),
        ("greater", Keysym('>' as u32)),
        ("question", Keysym('?' as u32)),
        ("at", Keysym('@' as u32)),
        ("bracketleft", Keysym('[' as u32)),
        ("backslash", Keysym('\\' as u32)),
        ("bracketright", Keysym(']' as u32)),
        ("asciicircum", Keysym('^' as u32)),
        ("underscore", Keysym('_' as u32)),
        ("grave", Keysym('`' as u32)),
        ("braceleft", Keysym('{' as u32)),
        ("bar", Keysym('|' as u32)),
        ("braceright", Keysym('}' as u32)),
        ("asciitilde", Keysym('~' as u32)),
    ]);
    for digit in 0..=9u32 {
        // "KP_0" .. "KP_9" need 'static names; spell them out.
        const KP_NAMES: [&str; 10] = [
            "KP_0", "KP_1", "KP_2", "KP_3", "KP_4", "KP_5", "KP_6", "KP_7", "KP_8", "KP_9",
        ];
        map.insert(KP_NAMES[digit as usize], Keysym(KEY_KP_0.0 + digit));
    }
    map
});

static KEYSYM_NAMES: Lazy<HashMap<Keysym, &'static str>> =
    Lazy::new(|| NAMED_KEYSYMS.iter().map(|(n, k)| (*k, *n)).collect());

impl Keysym {
    /// Keysym for a Unicode character.
    pub fn from_char(ch: char) -> Self {
        let cp = ch as u32;
        if cp < 0x100 {
            Keysym(cp)
        } else {
            Keysym(cp | UNICODE_KEYSYM_FLAG)
        }
    }

    /// The Unicode character this keysym produces when typed plainly, if any.
    pub fn to_char(self) -> Option<char> {
        match self.0 {
            0x20..=0x7e | 0xa0..=0xff => char::from_u32(self.0),
            cp if cp & UNICODE_KEYSYM_FLAG != 0 => char::from_u32(cp & !UNICODE_KEYSYM_FLAG),
            _ => None,
        }
    }

    /// Resolve a symbolic or single-character name ("comma", "dead_acute",
    /// "a", "ä").
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(sym) = NAMED_KEYSYMS.get(name) {
            return Some(*sym);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(Keysym::from_char(ch)),
            _ => {
                // Uxxxx notation used by some Compose files.
                let hex = name.strip_prefix('U')?;
                let cp = u32::from_str_radix(hex, 16).ok()?;
                char::from_u32(cp).map(Keysym::from_char)
            }
        }
    }

    /// Symbolic name if one exists, otherwise the character itself.
    pub fn name(self) -> String {
        if let Some(name) = KEYSYM_NAMES.get(&self) {
            return (*name).to_string();
        }
        match self.to_char() {
            Some(ch) => ch.to_string(),
            None => format!("0x{:x}", self.0),
        }
    }

    /// True for keysyms in the dead-key ranges.
    pub fn is_dead_key(self) -> bool {
        (0xfe50..=0xfe6f).contains(&self.0) || self == KEY_DEAD_GREEK
    }

    /// Combining mark a dead key stands for, if known.
    pub fn combining_mark(self) -> Option<char> {
        DEAD_KEY_COMBINING.get(&self).copied()
    }

    /// Plain counterpart of a keypad keysym (`KP_1` → `1`).
    pub fn keypad_to_plain(self) -> Option<Keysym> {
        KEYPAD_TO_PLAIN.get(&self).copied()
    }

    /// Keypad counterpart of a plain keysym (`1` → `KP_1`).
    pub fn plain_to_keypad(self) -> Option<Keysym> {
        PLAIN_TO_KEYPAD.get(&self).copied()
    }

    pub fn is_modifier_key(self) -> bool {
        (0xffe1..=0xffee).contains(&self.0) || self == KEY_ISO_LEVEL3_SHIFT
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Modifier state as a bit set, X11 mask layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(pub u32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    pub const LOCK: Modifiers = Modifiers(1 << 1);
    pub const CONTROL: Modifiers = Modifiers(1 << 2);
    pub const ALT: Modifiers = Modifiers(1 << 3);
    pub const SUPER: Modifiers = Modifiers(1 << 6);
    pub const LEVEL3: Modifiers = Modifiers(1 << 7);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The subset relevant for keybinding matching (caps lock ignored).
    pub fn binding_relevant(self) -> Modifiers {
        Modifiers(self.0 & (Self::SHIFT.0 | Self::CONTROL.0 | Self::ALT.0 | Self::SUPER.0))
    }

    pub fn from_name(name: &str) -> Option<Modifiers> {
        match name {
            "Shift" => Some(Self::SHIFT),
            "Control" | "Ctrl" => Some(Self::CONTROL),
            "Alt" | "Mod1" => Some(Self::ALT),
            "Super" | "Mod4" => Some(Self::SUPER),
            "AltGr" | "Mod5" => Some(Self::LEVEL3),
            _ => None,
        }
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;
    fn bitor(self, rhs: Modifiers) -> Modifiers {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_round_trip() {
        assert_eq!(Keysym::from_char('a').to_char(), Some('a'));
        assert_eq!(Keysym::from_char('ä').to_char(), Some('ä'));
        assert_eq!(Keysym::from_char('€').0, '€' as u32 | 0x0100_0000);
        assert_eq!(Keysym::from_char('€').to_char(), Some('€'));
        assert_eq!(KEY_DEAD_ACUTE.to_char(), None);
    }

    #[test]
    fn names_resolve_both_ways() {
        assert_eq!(Keysym::from_name("minus"), Some(Keysym('-' as u32)));
        assert_eq!(Keysym::from_name("dead_macron"), Some(KEY_DEAD_MACRON));
        assert_eq!(Keysym::from_name("KP_7"), Some(Keysym(KEY_KP_0.0 + 7)));
        assert_eq!(Keysym::from_name("x"), Some(Keysym('x' as u32)));
        assert_eq!(Keysym::from_name("U2014"), Some(Keysym::from_char('—')));
        assert_eq!(KEY_MULTI.name(), "Multi_key");
        assert_eq!(Keysym::from_char('-').name(), "minus");
    }

    #[test]
    fn dead_and_keypad_tables() {
        assert!(KEY_DEAD_CIRCUMFLEX.is_dead_key());
        assert!(!Keysym::from_char('x').is_dead_key());
        assert_eq!(KEY_DEAD_MACRON.combining_mark(), Some('\u{0304}'));
        assert_eq!(
            Keysym(KEY_KP_0.0 + 1).keypad_to_plain(),
            Some(Keysym('1' as u32))
        );
        assert_eq!(
            Keysym('1' as u32).plain_to_keypad(),
            Some(Keysym(KEY_KP_0.0 + 1))
        );
    }

    #[test]
    fn modifier_sets() {
        let mods = Modifiers::SHIFT | Modifiers::CONTROL;
        assert!(mods.contains(Modifiers::SHIFT));
        assert!(!mods.contains(Modifiers::ALT));
        assert_eq!(
            (mods | Modifiers::LOCK).binding_relevant(),
            Modifiers::SHIFT | Modifiers::CONTROL
        );
    }
}
