//! Type arguments handed from a codec to the codecs of its children.
//!
//! A codec for `Vec<Obj>` cannot know its element type from the static type. A
//! parent codec that does know it pushes the arguments before writing or reading
//! the child and pops them after, and the child omits per-element class headers.
//! A frame pushed at depth `d` is visible to codecs running at depth `d + 1`.

use crate::object::TypeInfo;

#[derive(Debug, Clone)]
struct Frame {
    depth: usize,
    arguments: Vec<TypeInfo>,
    cursor: usize,
}

/// Stack of type-argument frames keyed to traversal depth.
#[derive(Debug, Default, Clone)]
pub struct Generics {
    frames: Vec<Frame>,
}

impl Generics {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `arguments` for the children of the codec running at `depth`.
    pub fn push_type_arguments(&mut self, depth: usize, arguments: Vec<TypeInfo>) {
        self.frames.push(Frame {
            depth,
            arguments,
            cursor: 0,
        });
    }

    /// Frame pushed by the parent of a codec running at `depth`.
    fn visible(&self, depth: usize) -> Option<&Frame> {
        self.frames
            .last()
            .filter(|frame| depth > 0 && frame.depth == depth - 1)
    }

    /// Next unconsumed argument visible at `depth`.
    pub fn next_type(&mut self, depth: usize) -> Option<TypeInfo> {
        let frame = self
            .frames
            .last_mut()
            .filter(|frame| depth > 0 && frame.depth == depth - 1)?;
        let next = frame.arguments.get(frame.cursor).copied();
        if next.is_some() {
            frame.cursor += 1;
        }
        next
    }

    /// Argument `index` visible at `depth`, without consuming it.
    pub fn resolve_variable(&self, depth: usize, index: usize) -> Option<TypeInfo> {
        self.visible(depth)?.arguments.get(index).copied()
    }

    /// Pops the frame pushed at `depth`, if it is on top.
    pub fn pop_type_arguments(&mut self, depth: usize) -> Option<Vec<TypeInfo>> {
        if self.frames.last().is_some_and(|frame| frame.depth == depth) {
            self.frames.pop().map(|frame| frame.arguments)
        } else {
            None
        }
    }

    /// Number of frames on the stack.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if no frame is pushed.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drops every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
