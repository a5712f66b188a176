//! Arena-backed syntax tree.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`], so
//! parent links never own their target. Only token nodes (identifiers,
//! literals, keywords, call periods) carry a line; composite nodes span
//! whatever their descendants span.

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Node types produced by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Whole file.
    Program,
    /// Statement list inside a block or parentheses.
    Statements,
    /// `target = value`.
    Assign,
    /// `target += value` and friends.
    OpAssign,
    /// Assignment target.
    VarField,
    /// Reference to a local variable, constant or keyword value.
    VarRef,
    /// Bare identifier that may be a method call (`foo`).
    VCall,
    /// Receiver-less call with arguments or a block (`foo(1)`).
    FCall,
    /// Method call on a receiver (`recv.name`).
    Call,
    /// Method call on a receiver with unparenthesised arguments.
    CommandCall,
    /// Receiver-less call with unparenthesised arguments (`foo 1, 2`).
    Command,
    /// Call wrapped with its parenthesised arguments.
    MethodAddArg,
    /// Call wrapped with its block.
    MethodAddBlock,
    /// Parenthesised argument list.
    ArgParen,
    /// Argument or element list.
    Args,
    /// Hash entries without braces (`foo(a: 1)`).
    BareAssocHash,
    /// `[ ... ]`.
    Array,
    /// `{ ... }` used as a value.
    Hash,
    /// Hash entry.
    Assoc,
    /// Element reference (`recv[i]`).
    Aref,
    /// `( ... )` used as a value.
    Paren,
    /// Binary operation; the operator itself is not a node.
    Binary,
    /// Prefix operation.
    Unary,
    /// Quoted string.
    StringLiteral,
    /// Heredoc string.
    Heredoc,
    /// `:name`.
    SymbolLiteral,
    /// `{ |params| ... }` attached to a call.
    BraceBlock,
    /// `do |params| ... end` attached to a call.
    DoBlock,
    /// `|a, b|`.
    BlockParams,
    /// `def name ... end`; the header is not kept.
    Def,
    /// `class Name ... end`.
    Class,
    /// `module Name ... end`.
    Module,
    /// `if cond ... end`, including its `elsif` and `else` clauses.
    If,
    Unless,
    While,
    Until,
    /// `case [subject] when ... end`.
    Case,
    /// `begin ... end`.
    Begin,
    /// Clause keyword with its head (`elsif cond`, `when a, b`,
    /// `rescue Error => e`, `else`, `ensure`).
    Clause,
    /// Statement followed by `if`, `unless`, `while`, `until` or `rescue`.
    Modifier,

    // Token nodes.
    Ident,
    Const,
    Int,
    Float,
    TStringContent,
    Label,
    Kw,
    Period,
}

impl NodeKind {
    /// Whether this node wraps a single token and carries its line.
    #[must_use]
    pub const fn is_token(self) -> bool {
        matches!(
            self,
            Self::Ident
                | Self::Const
                | Self::Int
                | Self::Float
                | Self::TStringContent
                | Self::Label
                | Self::Kw
                | Self::Period
        )
    }

    /// Whether this node is a method invocation or a link of a call chain.
    #[must_use]
    pub const fn is_call_shaped(self) -> bool {
        matches!(
            self,
            Self::Call
                | Self::FCall
                | Self::VCall
                | Self::CommandCall
                | Self::MethodAddArg
                | Self::MethodAddBlock
        )
    }
}

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Line of the token this node wraps, for token nodes only.
    pub line: Option<usize>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SyntaxNode {
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Single-rooted syntax tree over a whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: NodeId,
}

impl SyntaxTree {
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Ancestors of `id`, nearest first, `id` itself excluded.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&current| self.parent(current))
    }

    /// `id` followed by all of its descendants, depth first.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.node(current).children.iter().rev());
        }
        out
    }
}

/// Bottom-up construction of a [`SyntaxTree`]: children first, then the
/// node that adopts them.
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<SyntaxNode>,
}

impl TreeBuilder {
    pub(crate) fn token(&mut self, kind: NodeKind, line: usize) -> NodeId {
        debug_assert!(kind.is_token());
        self.push(kind, Some(line), Vec::new())
    }

    pub(crate) fn branch(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        debug_assert!(!kind.is_token());
        self.push(kind, None, children)
    }

    pub(crate) fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub(crate) fn retag(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.0].kind = kind;
    }

    pub(crate) fn finish(self, root: NodeId) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            root,
        }
    }

    fn push(&mut self, kind: NodeKind, line: Option<usize>, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        for child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(SyntaxNode {
            kind,
            line,
            parent: None,
            children,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (SyntaxTree, NodeId, NodeId, NodeId) {
        let mut b = TreeBuilder::default();
        let ident = b.token(NodeKind::Ident, 1);
        let field = b.branch(NodeKind::VarField, vec![ident]);
        let int = b.token(NodeKind::Int, 2);
        let assign = b.branch(NodeKind::Assign, vec![field, int]);
        let root = b.branch(NodeKind::Program, vec![assign]);
        (b.finish(root), ident, int, assign)
    }

    #[test]
    fn parent_links() {
        let (tree, ident, int, assign) = sample();
        assert_eq!(tree.kind(tree.root()), NodeKind::Program);
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree.parent(int), Some(assign));
        assert_eq!(tree.node(ident).line, Some(1));
        assert_eq!(tree.node(assign).line, None);
    }

    #[test]
    fn ancestors_exclude_self_and_end_at_root() {
        let (tree, ident, _, assign) = sample();
        let chain: Vec<_> = tree.ancestors(ident).map(|id| tree.kind(id)).collect();
        assert_eq!(
            chain,
            vec![NodeKind::VarField, NodeKind::Assign, NodeKind::Program]
        );
        assert_eq!(tree.ancestors(tree.root()).count(), 0);
        assert_eq!(tree.ancestors(assign).next(), Some(tree.root()));
    }

    #[test]
    fn descendants_include_self_in_preorder() {
        let (tree, _, _, assign) = sample();
        let kinds: Vec<_> = tree
            .descendants(assign)
            .into_iter()
            .map(|id| tree.kind(id))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Assign,
                NodeKind::VarField,
                NodeKind::Ident,
                NodeKind::Int
            ]
        );
        assert_eq!(tree.descendants(tree.root()).len(), tree.len());
    }

    #[test]
    fn call_shapes() {
        assert!(NodeKind::MethodAddArg.is_call_shaped());
        assert!(NodeKind::VCall.is_call_shaped());
        assert!(!NodeKind::Command.is_call_shaped());
        assert!(!NodeKind::Assign.is_call_shaped());
        assert!(NodeKind::Period.is_token());
        assert!(!NodeKind::Call.is_token());
    }
}
