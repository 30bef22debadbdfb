//! DOT subset parser.
//!
//! Supported: `[strict] (graph|digraph) [id] { ... }` with `graph`/`node`/`edge` attribute
//! defaults, `key=value` graph attributes, node statements, edge chains (`a -> b -> c`) and
//! attribute lists. Subgraphs, ports beyond a bare `:name` suffix and HTML labels are rejected or
//! ignored.

mod lexer;

use crate::{Error, Result};
use indexmap::IndexMap;
use lexer::{Lexer, Spanned, Tok};
use std::iter::Peekable;

pub type Attrs = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotEdge {
    pub from: String,
    pub to: String,
    pub attrs: Attrs,
}

/// A parsed graph with attribute defaults already applied to every node and edge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotGraph {
    pub id: Option<String>,
    pub strict: bool,
    pub directed: bool,
    pub attrs: Attrs,
    /// Nodes in first-mention order.
    pub nodes: IndexMap<String, Attrs>,
    pub edges: Vec<DotEdge>,
}

impl DotGraph {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn node_attr<'a>(&'a self, node: &str, key: &str) -> Option<&'a str> {
        self.nodes.get(node)?.get(key).map(String::as_str)
    }
}

pub fn parse(input: &str) -> Result<DotGraph> {
    Parser::new(input).parse_graph()
}

struct Parser<'input> {
    input: &'input str,
    tokens: Peekable<Lexer<'input>>,
    graph: DotGraph,
    node_defaults: Attrs,
    edge_defaults: Attrs,
}

impl<'input> Parser<'input> {
    fn new(input: &'input str) -> Self {
        Self {
            input,
            tokens: Lexer::new(input).peekable(),
            graph: DotGraph::default(),
            node_defaults: Attrs::new(),
            edge_defaults: Attrs::new(),
        }
    }

    fn err(&self, offset: usize, message: impl Into<String>) -> Error {
        Error::parse_at(self.input, offset, message)
    }

    fn next(&mut self) -> Result<Option<Spanned>> {
        match self.tokens.next() {
            None => Ok(None),
            Some(Ok(t)) => Ok(Some(t)),
            Some(Err(e)) => Err(self.err(e.offset, e.message)),
        }
    }

    fn peek(&mut self) -> Result<Option<&Tok>> {
        let input = self.input;
        match self.tokens.peek() {
            None => Ok(None),
            Some(Ok((_, tok, _))) => Ok(Some(tok)),
            Some(Err(e)) => Err(Error::parse_at(input, e.offset, e.message.clone())),
        }
    }

    fn expect_next(&mut self, what: &str) -> Result<Spanned> {
        match self.next()? {
            Some(t) => Ok(t),
            None => Err(self.err(self.input.len(), format!("expected {what}, found end of input"))),
        }
    }

    fn expect(&mut self, want: Tok) -> Result<()> {
        let (start, tok, _) = self.expect_next(&want.describe())?;
        if tok != want {
            return Err(self.err(
                start,
                format!("expected {}, found {}", want.describe(), tok.describe()),
            ));
        }
        Ok(())
    }

    fn expect_id(&mut self, what: &str) -> Result<String> {
        let (start, tok, _) = self.expect_next(what)?;
        match tok {
            Tok::Id { text, .. } => Ok(text),
            other => Err(self.err(start, format!("expected {what}, found {}", other.describe()))),
        }
    }

    fn eat(&mut self, want: &Tok) -> Result<bool> {
        if self.peek()? == Some(want) {
            self.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn parse_graph(mut self) -> Result<DotGraph> {
        let (start, mut tok, _) = self.expect_next("`digraph` or `graph`")?;
        if tok.is_keyword("strict") {
            self.graph.strict = true;
            tok = self.expect_next("`digraph` or `graph`")?.1;
        }
        if tok.is_keyword("digraph") {
            self.graph.directed = true;
        } else if !tok.is_keyword("graph") {
            return Err(self.err(
                start,
                format!("expected `digraph` or `graph`, found {}", tok.describe()),
            ));
        }

        if let Some(Tok::Id { .. }) = self.peek()? {
            self.graph.id = Some(self.expect_id("graph id")?);
        }
        self.expect(Tok::LBrace)?;

        loop {
            match self.peek()? {
                None => {
                    return Err(self.err(self.input.len(), "expected `}`, found end of input"));
                }
                Some(Tok::RBrace) => {
                    self.next()?;
                    break;
                }
                Some(Tok::Semi | Tok::Comma) => {
                    self.next()?;
                }
                Some(_) => self.parse_stmt()?,
            }
        }

        if let Some((start, tok, _)) = self.next()? {
            return Err(self.err(start, format!("unexpected {} after graph", tok.describe())));
        }

        tracing::trace!(
            nodes = self.graph.nodes.len(),
            edges = self.graph.edges.len(),
            "parsed dot graph"
        );
        Ok(self.graph)
    }

    fn parse_stmt(&mut self) -> Result<()> {
        let (start, tok, _) = self.expect_next("statement")?;
        if tok.is_keyword("subgraph") || tok == Tok::LBrace {
            return Err(self.err(start, "subgraphs are not supported"));
        }
        if tok.is_keyword("graph") {
            let attrs = self.parse_attr_lists()?;
            self.graph.attrs.extend(attrs);
            return Ok(());
        }
        if tok.is_keyword("node") {
            let attrs = self.parse_attr_lists()?;
            self.node_defaults.extend(attrs);
            return Ok(());
        }
        if tok.is_keyword("edge") {
            let attrs = self.parse_attr_lists()?;
            self.edge_defaults.extend(attrs);
            return Ok(());
        }

        let Tok::Id { text: first, .. } = tok else {
            return Err(self.err(start, format!("expected statement, found {}", tok.describe())));
        };

        if self.eat(&Tok::Eq)? {
            let value = self.expect_id("attribute value")?;
            self.graph.attrs.insert(first, value);
            return Ok(());
        }

        self.skip_port()?;
        let mut chain = vec![first];
        loop {
            let (edge_start, op) = match self.peek()? {
                Some(Tok::Arrow | Tok::DashDash) => {
                    let (s, op, _) = self.expect_next("edge operator")?;
                    (s, op)
                }
                _ => break,
            };
            if (op == Tok::Arrow) != self.graph.directed {
                let message = if self.graph.directed {
                    "`--` edges are not allowed in a digraph"
                } else {
                    "`->` edges are not allowed in an undirected graph"
                };
                return Err(self.err(edge_start, message));
            }
            chain.push(self.expect_id("node id")?);
            self.skip_port()?;
        }

        let attrs = if self.peek()? == Some(&Tok::LBracket) {
            self.parse_attr_lists()?
        } else {
            Attrs::new()
        };

        if chain.len() == 1 {
            let id = chain.pop().unwrap_or_default();
            let node = self.touch_node(&id);
            node.extend(attrs);
            return Ok(());
        }

        for id in &chain {
            self.touch_node(id);
        }
        for pair in chain.windows(2) {
            let mut edge_attrs = self.edge_defaults.clone();
            edge_attrs.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
            if self.graph.strict
                && self
                    .graph
                    .edges
                    .iter()
                    .any(|e| e.from == pair[0] && e.to == pair[1])
            {
                continue;
            }
            self.graph.edges.push(DotEdge {
                from: pair[0].clone(),
                to: pair[1].clone(),
                attrs: edge_attrs,
            });
        }
        Ok(())
    }

    fn touch_node(&mut self, id: &str) -> &mut Attrs {
        let defaults = &self.node_defaults;
        self.graph
            .nodes
            .entry(id.to_string())
            .or_insert_with(|| defaults.clone())
    }

    /// `a:port` and `a:port:compass` are accepted; the port is ignored.
    fn skip_port(&mut self) -> Result<()> {
        while self.eat(&Tok::Colon)? {
            self.expect_id("port")?;
        }
        Ok(())
    }

    fn parse_attr_lists(&mut self) -> Result<Attrs> {
        let mut attrs = Attrs::new();
        if self.peek()? != Some(&Tok::LBracket) {
            let offset = self.tokens.peek().map_or(self.input.len(), |t| match t {
                Ok((s, _, _)) => *s,
                Err(e) => e.offset,
            });
            return Err(self.err(offset, "expected `[`"));
        }
        while self.eat(&Tok::LBracket)? {
            loop {
                if self.eat(&Tok::RBracket)? {
                    break;
                }
                let key = self.expect_id("attribute name")?;
                self.expect(Tok::Eq)?;
                let value = self.expect_id("attribute value")?;
                attrs.insert(key, value);
                if !self.eat(&Tok::Comma)? {
                    self.eat(&Tok::Semi)?;
                }
            }
        }
        Ok(attrs)
    }
}
