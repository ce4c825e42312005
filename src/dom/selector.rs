use crate::dom::dom_model::{Dom, ElementInfo, NodeId};

// ============================================================================
// Selector model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeTest {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
    nth_child: Option<usize>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.nth_child.is_none()
    }

    fn matches(&self, info: &ElementInfo, sibling_index: Option<usize>) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !tag.eq_ignore_ascii_case(&info.tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if info.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| info.has_class(c)) {
            return false;
        }
        let attributes_match = self.attributes.iter().all(|test| match test {
            AttributeTest::Exists(name) => info.attribute(name).is_some(),
            AttributeTest::Equals(name, value) => info.attribute(name) == Some(value.as_str()),
        });
        if !attributes_match {
            return false;
        }
        match self.nth_child {
            Some(n) => sibling_index == Some(n),
            None => true,
        }
    }
}

/// A parsed CSS selector: compound selectors joined by descendant or child
/// combinators. Selector lists (`,`) and pseudo-classes other than
/// `:nth-child(n)` are not supported and fail to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    // The combinator on the first part is never consulted.
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn parse(input: &str) -> Option<Self> {
        Parser::new(input).parse()
    }

    pub fn matches(&self, dom: &dyn Dom, node: NodeId) -> bool {
        self.match_from(dom, node, self.parts.len() - 1)
    }

    fn match_from(&self, dom: &dyn Dom, node: NodeId, index: usize) -> bool {
        let Some(info) = dom.element(node) else {
            return false;
        };
        let (combinator, compound) = &self.parts[index];
        let sibling_index = compound.nth_child.and_then(|_| nth_child_index(dom, node));
        if !compound.matches(&info, sibling_index) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match combinator {
            Combinator::Child => dom
                .parent(node)
                .is_some_and(|parent| self.match_from(dom, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = dom.parent(node);
                while let Some(ancestor) = current {
                    if self.match_from(dom, ancestor, index - 1) {
                        return true;
                    }
                    current = dom.parent(ancestor);
                }
                false
            }
        }
    }
}

/// 1-based position among the parent's children; roots count as first.
fn nth_child_index(dom: &dyn Dom, node: NodeId) -> Option<usize> {
    match dom.parent(node) {
        Some(parent) => dom
            .children(parent)
            .iter()
            .position(|child| *child == node)
            .map(|i| i + 1),
        None => Some(1),
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.trim().chars().peekable(),
        }
    }

    fn parse(mut self) -> Option<Selector> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;

        loop {
            let compound = self.compound()?;
            if compound.is_empty() {
                return None;
            }
            parts.push((combinator, compound));

            let saw_space = self.skip_whitespace();
            match self.chars.peek() {
                None => break,
                Some('>') => {
                    self.chars.next();
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if saw_space => combinator = Combinator::Descendant,
                Some(_) => return None,
            }
        }

        Some(Selector { parts })
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn compound(&mut self) -> Option<Compound> {
        let mut compound = Compound::default();

        if self.chars.peek() == Some(&'*') {
            self.chars.next();
            compound.tag = Some("*".into());
        } else if self.chars.peek().is_some_and(|c| is_ident_char(*c)) {
            compound.tag = Some(self.identifier()?);
        }

        while let Some(&c) = self.chars.peek() {
            match c {
                '#' => {
                    self.chars.next();
                    compound.id = Some(self.identifier()?);
                }
                '.' => {
                    self.chars.next();
                    compound.classes.push(self.identifier()?);
                }
                '[' => {
                    self.chars.next();
                    compound.attributes.push(self.attribute()?);
                }
                ':' => {
                    self.chars.next();
                    compound.nth_child = Some(self.nth_child()?);
                }
                _ => break,
            }
        }

        Some(compound)
    }

    fn identifier(&mut self) -> Option<String> {
        let mut out = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\\' {
                self.chars.next();
                out.push(self.chars.next()?);
            } else if is_ident_char(c) {
                out.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        (!out.is_empty()).then_some(out)
    }

    fn attribute(&mut self) -> Option<AttributeTest> {
        self.skip_whitespace();
        let name = self.identifier()?;
        self.skip_whitespace();
        match self.chars.next()? {
            ']' => Some(AttributeTest::Exists(name)),
            '=' => {
                self.skip_whitespace();
                let value = match self.chars.peek()? {
                    '"' | '\'' => self.quoted()?,
                    _ => self.identifier()?,
                };
                self.skip_whitespace();
                (self.chars.next()? == ']').then_some(AttributeTest::Equals(name, value))
            }
            _ => None,
        }
    }

    fn quoted(&mut self) -> Option<String> {
        let quote = self.chars.next()?;
        let mut out = String::new();
        loop {
            match self.chars.next()? {
                '\\' => out.push(self.chars.next()?),
                c if c == quote => return Some(out),
                c => out.push(c),
            }
        }
    }

    fn nth_child(&mut self) -> Option<usize> {
        let name = self.identifier()?;
        if name != "nth-child" || self.chars.next()? != '(' {
            return None;
        }
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == ')' {
                break;
            }
            digits.push(c);
            self.chars.next();
        }
        self.chars.next()?;
        digits.trim().parse().ok().filter(|n| *n > 0)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
