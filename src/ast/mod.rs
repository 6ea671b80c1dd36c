//! Node tree for dynamic SQL statement bodies
//!
//! A statement body parses once into an immutable tree of [`SqlNode`]s. The
//! tree is owned by its statement template and shared read-only across all
//! calls; every call evaluates it into a fresh context.

use smallvec::SmallVec;

/// One node of a statement body
///
/// Large variants are boxed to keep the enum small; the composite variant is
/// by far the most common and holds its children inline.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Literal SQL text with no substitutions
    StaticText(StaticTextNode),

    /// SQL text containing `${...}` raw substitutions, resolved per call
    Text(TextNode),

    /// Ordered sequence of child nodes; contributions concatenate in order
    Mixed(Box<MixedNode>),

    /// Conditional subtree, contributes only when its test is true
    If(Box<IfNode>),

    /// Prefix/suffix trimming around a child subtree
    Trim(Box<TrimNode>),

    /// `WHERE` clause sugar: trim preconfigured for `AND`/`OR` joining
    Where(Box<WhereNode>),

    /// `SET` clause sugar: trim preconfigured for comma joining
    Set(Box<SetNode>),

    /// Loop unrolling with separators over an enumerable collection
    Foreach(Box<ForeachNode>),

    /// First-match branching over ordered conditional children
    Choose(Box<ChooseNode>),

    /// Named variable declaration, visible to subsequent siblings
    Bind(BindNode),
}

impl SqlNode {
    /// Whether this subtree requires per-call evaluation.
    ///
    /// A template is static exactly when its tree is static text (possibly
    /// nested in composites); everything else forces per-call evaluation.
    pub fn is_dynamic(&self) -> bool {
        match self {
            SqlNode::StaticText(_) => false,
            SqlNode::Mixed(mixed) => mixed.is_dynamic(),
            _ => true,
        }
    }
}

/// Literal SQL text appended verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTextNode {
    /// The text to append
    pub text: String,
}

/// SQL text with `${...}` raw substitutions.
///
/// Substitutions are evaluated against the variable scope and inserted
/// verbatim, with no quoting or escaping; injection safety is the caller's
/// responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    /// The text, still containing its `${...}` markers
    pub text: String,
}

/// Ordered composite of child nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MixedNode {
    /// Children in document order
    pub contents: SmallVec<[SqlNode; 4]>,
}

impl MixedNode {
    /// Whether any child requires per-call evaluation
    pub fn is_dynamic(&self) -> bool {
        self.contents.iter().any(SqlNode::is_dynamic)
    }
}

/// `<if test="...">` (and `<when>` inside `<choose>`)
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    /// Boolean test expression
    pub test: String,
    /// Subtree applied when the test passes
    pub contents: MixedNode,
}

/// `<trim>` with explicit prefix/suffix rules.
///
/// Override token lists are already split on `|` at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimNode {
    /// Subtree whose output is trimmed
    pub contents: MixedNode,
    /// Text prepended when the trimmed body is non-empty
    pub prefix: Option<String>,
    /// Leading tokens stripped from the body (case-insensitive)
    pub prefix_overrides: Vec<String>,
    /// Text appended when the trimmed body is non-empty
    pub suffix: Option<String>,
    /// Trailing tokens stripped from the body (case-insensitive)
    pub suffix_overrides: Vec<String>,
}

/// `<where>`: contributes `WHERE ...` only when the body is non-empty
#[derive(Debug, Clone, PartialEq)]
pub struct WhereNode {
    /// Clause subtree
    pub contents: MixedNode,
}

/// `<set>`: contributes `SET ...` with stray commas removed
#[derive(Debug, Clone, PartialEq)]
pub struct SetNode {
    /// Assignment subtree
    pub contents: MixedNode,
}

/// `<foreach>` loop unrolling
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachNode {
    /// Body applied once per element
    pub contents: MixedNode,
    /// Expression resolving to the collection to iterate
    pub collection: String,
    /// Name bound to the current element value
    pub item: String,
    /// Name bound to the current position (or key for mappings)
    pub index: Option<String>,
    /// Text opening the joined result
    pub open: Option<String>,
    /// Text closing the joined result
    pub close: Option<String>,
    /// Text between successive non-empty contributions
    pub separator: Option<String>,
    /// Whether a null collection is tolerated (iterates zero times)
    pub nullable: bool,
}

/// `<choose>` with ordered `<when>` branches and an optional default
#[derive(Debug, Clone, PartialEq)]
pub struct ChooseNode {
    /// Ordered branches; the first whose test passes wins
    pub whens: Vec<IfNode>,
    /// Default subtree when no branch matched
    pub otherwise: Option<MixedNode>,
}

/// `<bind name="..." value="..."/>` variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct BindNode {
    /// Variable name
    pub name: String,
    /// Expression evaluated to produce the variable's value
    pub value: String,
}
