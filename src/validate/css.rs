//! Stylesheet model used by the style-based checks.
//!
//! Rules keep their selector text and raw declaration values. Custom
//! properties declared on `:root` are resolved per color scheme: the
//! unconditional rules form the base scheme and every `@media` block adds a
//! scheme that overrides the base variables with its own.

use std::collections::HashMap;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};

use super::contrast::{Rgba, parse_color};

/// Nesting limit for `var()` references.
const MAX_VAR_DEPTH: usize = 8;

/// A parsed stylesheet.
#[derive(Debug, Default, Clone)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

/// A style rule with its selectors, declarations and enclosing media query.
#[derive(Debug, Clone)]
pub struct CssRule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
    pub media: Option<String>,
}

/// A declaration with its raw value text.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Stylesheet {
    /// Parse a stylesheet. Invalid rules are skipped.
    pub fn parse(css: &str) -> Self {
        let mut sheet = Stylesheet::default();
        sheet.append(css);
        sheet
    }

    /// Parse more CSS into this sheet, after the existing rules.
    pub fn append(&mut self, css: &str) {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rule_parser = RuleCollector {
            rules: &mut self.rules,
            media: None,
        };
        for result in StyleSheetParser::new(&mut parser, &mut rule_parser) {
            let _ = result;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Color schemes: the base scheme first, then one per media query in
    /// order of first appearance.
    pub fn schemes(&self) -> Vec<Scheme<'_>> {
        let base_vars = self.root_variables(None);
        let mut schemes = vec![Scheme {
            media: None,
            vars: base_vars.clone(),
        }];
        for rule in &self.rules {
            let Some(media) = rule.media.as_deref() else {
                continue;
            };
            if schemes.iter().any(|s| s.media == Some(media)) {
                continue;
            }
            let mut vars = base_vars.clone();
            vars.extend(self.root_variables(Some(media)));
            schemes.push(Scheme {
                media: Some(media),
                vars,
            });
        }
        schemes
    }

    /// Rules that apply under a scheme.
    pub fn rules_in<'a>(&'a self, scheme: &'a Scheme<'_>) -> impl Iterator<Item = &'a CssRule> + 'a {
        self.rules
            .iter()
            .filter(move |r| r.media.is_none() || r.media.as_deref() == scheme.media)
    }

    fn root_variables(&self, media: Option<&str>) -> HashMap<String, String> {
        self.rules
            .iter()
            .filter(|r| r.media.as_deref() == media && r.is_root())
            .flat_map(|r| r.declarations.iter())
            .filter(|d| d.property.starts_with("--"))
            .map(|d| (d.property.clone(), d.value.clone()))
            .collect()
    }

    /// Page background under a scheme, white when nothing is declared.
    pub fn page_background(&self, scheme: &Scheme<'_>) -> Rgba {
        self.rules_in(scheme)
            .filter(|r| r.is_root() || r.has_selector("body"))
            .filter_map(|r| match r.background(scheme) {
                ColorValue::Color(c) if c.is_opaque() => Some(c),
                _ => None,
            })
            .last()
            .unwrap_or(Rgba::WHITE)
    }

    /// True when any rule declares a property matching `pred`.
    pub fn any_declaration(&self, pred: impl Fn(&Declaration) -> bool) -> bool {
        self.rules.iter().flat_map(|r| r.declarations.iter()).any(pred)
    }
}

impl Declaration {
    /// `outline: none`, `outline: 0`, `outline-style: none` or
    /// `outline-width: 0`.
    pub fn removes_outline(&self) -> bool {
        let value = self.value.trim().to_ascii_lowercase();
        match self.property.as_str() {
            "outline" => {
                !value.is_empty() && value.split_whitespace().all(|t| t == "none" || is_zero(t))
            }
            "outline-style" => value == "none",
            "outline-width" => is_zero(&value),
            _ => false,
        }
    }
}

fn is_zero(value: &str) -> bool {
    value
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
        .parse::<f32>()
        .is_ok_and(|v| v == 0.0)
}

/// Outcome of looking up a color property.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorValue {
    Missing,
    Color(Rgba),
    /// Declared but not computable without layout (keywords, images,
    /// undefined variables).
    Unresolved(String),
}

impl CssRule {
    /// Last declared value of a property.
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    pub fn selector_text(&self) -> String {
        self.selectors.join(", ")
    }

    pub fn has_selector(&self, selector: &str) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }

    fn is_root(&self) -> bool {
        self.selectors.iter().any(|s| s == ":root" || s == "html")
    }

    /// Foreground color declared by this rule.
    pub fn color(&self, scheme: &Scheme<'_>) -> ColorValue {
        match self.get("color") {
            Some(value) => scheme.color(value),
            None => ColorValue::Missing,
        }
    }

    /// Background color declared by this rule, from `background-color` or
    /// the `background` shorthand.
    pub fn background(&self, scheme: &Scheme<'_>) -> ColorValue {
        if let Some(value) = self.get("background-color") {
            return scheme.color(value);
        }
        let Some(value) = self.get("background") else {
            return ColorValue::Missing;
        };
        let Some(resolved) = scheme.resolve(value) else {
            return ColorValue::Unresolved(value.to_string());
        };
        if resolved.contains("url(") || resolved.contains("gradient(") {
            return ColorValue::Unresolved(value.to_string());
        }
        if let Some(color) = parse_color(&resolved) {
            return ColorValue::Color(color);
        }
        resolved
            .split_whitespace()
            .find_map(parse_color)
            .map_or_else(|| ColorValue::Unresolved(value.to_string()), ColorValue::Color)
    }
}

/// Variables in effect for one color scheme.
#[derive(Debug, Clone)]
pub struct Scheme<'a> {
    pub media: Option<&'a str>,
    vars: HashMap<String, String>,
}

impl Scheme<'_> {
    /// Human-readable scheme name for messages.
    pub fn label(&self) -> String {
        match self.media {
            Some(media) => format!("@media {media}"),
            None => "default scheme".to_string(),
        }
    }

    /// Substitute `var()` references. `None` when a variable is undefined
    /// and has no fallback.
    pub fn resolve(&self, value: &str) -> Option<String> {
        self.resolve_depth(value, 0)
    }

    fn resolve_depth(&self, value: &str, depth: usize) -> Option<String> {
        if depth > MAX_VAR_DEPTH {
            return None;
        }
        let Some(start) = value.find("var(") else {
            return Some(value.to_string());
        };
        let inner_start = start + "var(".len();
        let end = matching_paren(value, inner_start)?;
        let inner = &value[inner_start..end];
        let (name, fallback) = match inner.split_once(',') {
            Some((name, fallback)) => (name.trim(), Some(fallback.trim())),
            None => (inner.trim(), None),
        };
        let replacement = match (self.vars.get(name), fallback) {
            (Some(v), _) => self.resolve_depth(v, depth + 1)?,
            (None, Some(f)) => self.resolve_depth(f, depth + 1)?,
            (None, None) => return None,
        };
        let rest = format!("{}{}{}", &value[..start], replacement, &value[end + 1..]);
        self.resolve_depth(&rest, depth + 1)
    }

    /// Resolve and parse a color value.
    pub fn color(&self, value: &str) -> ColorValue {
        match self.resolve(value).as_deref().and_then(parse_color) {
            Some(color) => ColorValue::Color(color),
            None => ColorValue::Unresolved(value.to_string()),
        }
    }
}

/// Index of the `)` closing the group that starts at `from`.
fn matching_paren(s: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[from..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(from + i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Parse the declarations of a `style` attribute.
pub fn parse_declarations(style: &str) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut decl_parser = DeclarationListParser {
        declarations: &mut declarations,
    };
    for result in RuleBodyParser::new(&mut parser, &mut decl_parser) {
        let _ = result;
    }
    declarations
}

/// Write declarations back as a `style` attribute value.
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| {
            if d.important {
                format!("{}: {} !important", d.property, d.value)
            } else {
                format!("{}: {}", d.property, d.value)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Split a selector list on top-level commas.
fn split_selectors(prelude: &str) -> Vec<String> {
    let mut selectors = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in prelude.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                selectors.push(prelude[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    selectors.push(prelude[start..].trim().to_string());
    selectors.retain(|s| !s.is_empty());
    selectors
}

// =============================================================================
// cssparser glue
// =============================================================================

struct RuleCollector<'a> {
    rules: &'a mut Vec<CssRule>,
    media: Option<String>,
}

impl<'i> AtRuleParser<'i> for RuleCollector<'_> {
    type Prelude = String;
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        // Only conditional groups carry style rules we evaluate.
        if !name.eq_ignore_ascii_case("media") {
            return Err(input.new_custom_error(()));
        }
        let start = input.position();
        while input.next().is_ok() {}
        Ok(input.slice_from(start).trim().to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        let media = match &self.media {
            Some(outer) => format!("{outer} and {prelude}"),
            None => prelude,
        };
        let mut nested = RuleCollector {
            rules: &mut *self.rules,
            media: Some(media),
        };
        for result in StyleSheetParser::new(input, &mut nested) {
            let _ = result;
        }
        Ok(())
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleCollector<'_> {
    type Prelude = Vec<String>;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next().is_ok() {}
        let selectors = split_selectors(input.slice_from(start));
        if selectors.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(selectors)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut declarations = Vec::new();
        let mut decl_parser = DeclarationListParser {
            declarations: &mut declarations,
        };
        for result in RuleBodyParser::new(input, &mut decl_parser) {
            let _ = result;
        }
        self.rules.push(CssRule {
            selectors: prelude,
            declarations,
            media: self.media.clone(),
        });
        Ok(())
    }
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Vec<Declaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let property = if name.starts_with("--") {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        };

        let start = input.position();
        let mut end = start;
        let mut important = false;
        loop {
            if input.try_parse(cssparser::parse_important).is_ok() {
                important = true;
                break;
            }
            if input.next_including_whitespace().is_err() {
                break;
            }
            end = input.position();
        }
        let value = input.slice(start..end).trim().to_string();

        self.declarations.push(Declaration {
            property,
            value,
            important,
        });
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"
        :root { --fg: #1f1f1f; --bg: #ffffff; }
        @media (prefers-color-scheme: dark) {
          :root { --fg: #e8e8e8; --bg: #121212; }
        }
        body { color: var(--fg); background: var(--bg); }
        a:hover, a:focus { outline: 3px solid var(--accent, #0055aa) !important; }
        @font-face { font-family: X; src: url(x.woff); }
    "#;

    #[test]
    fn rules_and_media() {
        let sheet = Stylesheet::parse(SHEET);
        assert_eq!(sheet.rules.len(), 4);
        assert_eq!(sheet.rules[1].media.as_deref(), Some("(prefers-color-scheme: dark)"));
        assert_eq!(sheet.rules[3].selectors, vec!["a:hover", "a:focus"]);
        let outline = &sheet.rules[3].declarations[0];
        assert_eq!(outline.value, "3px solid var(--accent, #0055aa)");
        assert!(outline.important);
    }

    #[test]
    fn schemes_override_root_variables() {
        let sheet = Stylesheet::parse(SHEET);
        let schemes = sheet.schemes();
        assert_eq!(schemes.len(), 2);
        let body = &sheet.rules[2];
        assert_eq!(body.color(&schemes[0]), ColorValue::Color(Rgba::rgb(31, 31, 31)));
        assert_eq!(body.background(&schemes[1]), ColorValue::Color(Rgba::rgb(18, 18, 18)));
        assert_eq!(sheet.page_background(&schemes[1]), Rgba::rgb(18, 18, 18));
        assert!(schemes[1].label().starts_with("@media"));
    }

    #[test]
    fn var_fallbacks_and_unknowns() {
        let sheet = Stylesheet::parse(SHEET);
        let scheme = &sheet.schemes()[0];
        assert_eq!(scheme.resolve("var(--missing, #000)").as_deref(), Some("#000"));
        assert_eq!(scheme.resolve("1px solid var(--fg)").as_deref(), Some("1px solid #1f1f1f"));
        assert_eq!(scheme.resolve("var(--missing)"), None);
        assert!(matches!(scheme.color("inherit"), ColorValue::Unresolved(_)));
    }

    #[test]
    fn background_shorthand() {
        let sheet = Stylesheet::parse(
            ".a { background: #fff no-repeat; } .b { background: url(x.png); } .c { color: red; }",
        );
        let scheme = &sheet.schemes()[0];
        assert_eq!(sheet.rules[0].background(scheme), ColorValue::Color(Rgba::WHITE));
        assert!(matches!(sheet.rules[1].background(scheme), ColorValue::Unresolved(_)));
        assert_eq!(sheet.rules[2].background(scheme), ColorValue::Missing);
    }

    #[test]
    fn inline_declarations() {
        let decls = parse_declarations("color: red; OUTLINE: none ;background:url(a;b.png)");
        assert_eq!(decls.len(), 3);
        assert_eq!(decls[1].property, "outline");
        assert_eq!(decls[1].value, "none");
        assert_eq!(decls[2].value, "url(a;b.png)");
        assert_eq!(serialize_declarations(&decls[..2]), "color: red; outline: none");
    }

    #[test]
    fn outline_removal() {
        let decls = parse_declarations(
            "outline: none; outline: 0; outline-width: 0px; outline: 2px solid red; outline-style: dotted",
        );
        let removes: Vec<bool> = decls.iter().map(Declaration::removes_outline).collect();
        assert_eq!(removes, vec![true, true, true, false, false]);
    }
}
