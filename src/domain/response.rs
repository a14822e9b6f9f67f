//! Import responses arranged as a tree
//!
//! One root response per imported document and one nested response per
//! child produced by a splitter. Nodes live in an arena owned by the
//! tree; parents are looked up by index, never owned by their children.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::document::Document;
use super::error::ImporterError;

/// Index of a response within its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResponseId(usize);

/// Terminal state of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    /// Dropped by a filter
    Rejected,
    Error,
}

/// Status with optional detail
#[derive(Debug, Clone, PartialEq)]
pub struct ImporterStatus {
    pub status: Status,
    pub description: Option<String>,
    pub error: Option<ImporterError>,
}

impl ImporterStatus {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            description: None,
            error: None,
        }
    }

    pub fn rejected(description: impl Into<String>) -> Self {
        Self {
            status: Status::Rejected,
            description: Some(description.into()),
            error: None,
        }
    }

    pub fn error(error: ImporterError) -> Self {
        Self {
            status: Status::Error,
            description: Some(error.to_string()),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_rejected(&self) -> bool {
        self.status == Status::Rejected
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}

/// Outcome for one document
#[derive(Debug, Clone)]
pub struct ImporterResponse {
    reference: String,
    status: ImporterStatus,
    document: Option<Document>,
    parent: Option<ResponseId>,
    nested: Vec<ResponseId>,
}

impl ImporterResponse {
    pub fn new(reference: impl Into<String>, status: ImporterStatus) -> Self {
        Self {
            reference: reference.into(),
            status,
            document: None,
            parent: None,
            nested: Vec::new(),
        }
    }

    pub fn success(document: Document) -> Self {
        Self::new(document.reference(), ImporterStatus::success()).with_document(document)
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn status(&self) -> &ImporterStatus {
        &self.status
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn parent(&self) -> Option<ResponseId> {
        self.parent
    }

    pub fn nested(&self) -> &[ResponseId] {
        &self.nested
    }
}

/// Arena-backed response tree
#[derive(Debug, Clone)]
pub struct ResponseTree {
    nodes: Vec<Option<ImporterResponse>>,
}

impl ResponseTree {
    /// Create a tree holding a single root response
    pub fn new(mut root: ImporterResponse) -> Self {
        root.parent = None;
        root.nested.clear();
        Self {
            nodes: vec![Some(root)],
        }
    }

    pub fn root(&self) -> ResponseId {
        ResponseId(0)
    }

    pub fn root_response(&self) -> Option<&ImporterResponse> {
        self.get(self.root())
    }

    pub fn get(&self, id: ResponseId) -> Option<&ImporterResponse> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ResponseId) -> Option<&mut ImporterResponse> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of responses reachable from the root
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: ResponseId) -> Option<ResponseId> {
        self.get(id).and_then(|r| r.parent)
    }

    pub fn nested(&self, id: ResponseId) -> &[ResponseId] {
        self.get(id).map(|r| r.nested.as_slice()).unwrap_or(&[])
    }

    /// Attach a response under `parent`, returning its id
    ///
    /// Any nested ids carried by `response` are discarded; use
    /// [`ResponseTree::graft`] to attach a whole subtree.
    pub fn add_nested(&mut self, parent: ResponseId, mut response: ImporterResponse) -> ResponseId {
        let id = ResponseId(self.nodes.len());
        response.parent = Some(parent);
        response.nested.clear();
        self.nodes.push(Some(response));

        if let Some(parent) = self.get_mut(parent) {
            parent.nested.push(id);
        }
        id
    }

    /// Attach another tree under `parent`, returning the id of its root
    pub fn graft(&mut self, parent: ResponseId, mut subtree: ResponseTree) -> ResponseId {
        let subtree_root = subtree.root();
        self.graft_node(parent, &mut subtree, subtree_root)
    }

    fn graft_node(
        &mut self,
        parent: ResponseId,
        source: &mut ResponseTree,
        source_id: ResponseId,
    ) -> ResponseId {
        let Some(mut response) = source.nodes.get_mut(source_id.0).and_then(Option::take) else {
            return parent;
        };

        let children = std::mem::take(&mut response.nested);
        let id = self.add_nested(parent, response);
        for child in children {
            self.graft_node(id, source, child);
        }
        id
    }

    /// Detach the first nested response with this reference
    ///
    /// The detached subtree is returned as its own tree; its root no
    /// longer has a parent.
    pub fn remove_nested(&mut self, parent: ResponseId, reference: &str) -> Option<ResponseTree> {
        let position = self
            .nested(parent)
            .iter()
            .position(|id| self.get(*id).is_some_and(|r| r.reference == reference))?;

        let child = self.get_mut(parent)?.nested.remove(position);
        let mut root = self.nodes.get_mut(child.0).and_then(Option::take)?;
        let grandchildren = std::mem::take(&mut root.nested);

        let mut detached = ResponseTree::new(root);
        for grandchild in grandchildren {
            detached.graft_node(detached.root(), self, grandchild);
        }
        Some(detached)
    }

    /// Depth-first, pre-order traversal from the root
    pub fn iter(&self) -> impl Iterator<Item = (ResponseId, &ImporterResponse)> + '_ {
        let mut stack = vec![self.root()];
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                if let Some(response) = self.get(id) {
                    stack.extend(response.nested.iter().rev().copied());
                    return Some((id, response));
                }
            }
            None
        })
    }

    /// Number of levels; a lone root has depth 1
    pub fn depth(&self) -> usize {
        self.iter()
            .map(|(id, _)| self.level(id) + 1)
            .max()
            .unwrap_or(0)
    }

    fn level(&self, id: ResponseId) -> usize {
        let mut level = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            level += 1;
            current = self.parent(parent);
        }
        level
    }

    /// Root succeeded and no response in the tree is an error
    pub fn is_success(&self) -> bool {
        self.root_response()
            .is_some_and(|root| root.status.is_success())
            && self.iter().all(|(_, r)| !r.status.is_error())
    }

    /// Documents of every successful response, in traversal order
    pub fn documents(&self) -> Vec<&Document> {
        self.iter()
            .filter(|(_, r)| r.status.is_success())
            .filter_map(|(_, r)| r.document.as_ref())
            .collect()
    }

    /// Serializable nested view starting at `id`
    pub fn view(&self, id: ResponseId) -> ResponseView<'_> {
        ResponseView { tree: self, id }
    }
}

impl Serialize for ResponseTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view(self.root()).serialize(serializer)
    }
}

/// Borrowed response with its nested responses, for serialization
pub struct ResponseView<'a> {
    tree: &'a ResponseTree,
    id: ResponseId,
}

impl Serialize for ResponseView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(response) = self.tree.get(self.id) else {
            return serializer.serialize_none();
        };

        let nested: Vec<ResponseView<'_>> = response
            .nested
            .iter()
            .map(|id| self.tree.view(*id))
            .collect();

        let mut state = serializer.serialize_struct("ImporterResponse", 5)?;
        state.serialize_field("reference", &response.reference)?;
        state.serialize_field("status", &response.status.status)?;
        state.serialize_field("description", &response.status.description)?;
        state.serialize_field("metadata", &response.document.as_ref().map(Document::metadata))?;
        state.serialize_field("nested", &nested)?;
        state.end()
    }
}
