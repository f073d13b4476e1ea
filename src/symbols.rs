use crate::types::Type;
use fxhash::FxHashMap;
use std::{
    cell::RefCell,
    fmt,
    hash::{Hash, Hasher},
    rc::{Rc, Weak},
};

/// A shared handle to a named binding. Symbols are compared and hashed by
/// handle identity, never by name: two declarations of `x` in different
/// scopes are distinct symbols.
///
/// The type of a symbol is set when it is declared. It may be re-pointed at a
/// new type term if the declaration is revised, but the old term is never
/// mutated in place.
#[derive(Clone)]
pub struct Symbol {
    data: Rc<SymbolData>,
}

struct SymbolData {
    name: String,
    ty: RefCell<Type>,
    /// The first frame this symbol was added to. Kept weak; frames own their
    /// symbols, not the other way around.
    frame: RefCell<Weak<RefCell<FrameData>>>,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn ty(&self) -> Type {
        self.data.ty.borrow().clone()
    }

    /// Re-point this symbol at a new type term.
    pub fn set_ty(&self, ty: Type) {
        *self.data.ty.borrow_mut() = ty;
    }

    /// The frame that first adopted this symbol, if it still exists.
    pub fn frame(&self) -> Option<Frame> {
        self.data.frame.borrow().upgrade().map(|data| Frame { data })
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.data).hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.data.name)
    }
}

/// A shared handle to an ordered, named scope: record fields, function or
/// template parameters, select bindings, block locals. Name resolution walks
/// the parent chain. Duplicate names within one frame are rejected upstream
/// by the builder.
#[derive(Clone, Default)]
pub struct Frame {
    data: Rc<RefCell<FrameData>>,
}

#[derive(Default)]
struct FrameData {
    parent: Option<Frame>,
    symbols: Vec<Symbol>,
    index: FxHashMap<String, usize>,
}

impl Frame {
    /// A new root frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new sub-frame of `parent`.
    pub fn with_parent(parent: &Frame) -> Self {
        Frame {
            data: Rc::new(RefCell::new(FrameData {
                parent: Some(parent.clone()),
                symbols: Vec::new(),
                index: FxHashMap::default(),
            })),
        }
    }

    /// Adds a symbol of the given name and type to the frame and returns it.
    /// The symbol records this frame as its owner unless it already has one.
    pub fn add(&self, name: impl Into<String>, ty: Type) -> Symbol {
        let name = name.into();
        let symbol = Symbol {
            data: Rc::new(SymbolData {
                name: name.clone(),
                ty: RefCell::new(ty),
                frame: RefCell::new(Rc::downgrade(&self.data)),
            }),
        };
        self.adopt(symbol.clone());
        symbol
    }

    /// Adds an existing symbol to this frame. Only the first adopting frame
    /// is recorded on the symbol.
    pub fn adopt(&self, symbol: Symbol) {
        if symbol.data.frame.borrow().upgrade().is_none() {
            *symbol.data.frame.borrow_mut() = Rc::downgrade(&self.data);
        }
        let mut data = self.data.borrow_mut();
        let index = data.symbols.len();
        if !symbol.name().is_empty() {
            data.index.insert(symbol.name().to_string(), index);
        }
        data.symbols.push(symbol);
    }

    pub fn size(&self) -> usize {
        self.data.borrow().symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The `index`th symbol of this frame. Panics when out of bounds.
    pub fn get(&self, index: usize) -> Symbol {
        self.data.borrow().symbols[index].clone()
    }

    /// All symbols of this frame, in declaration order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.data.borrow().symbols.clone()
    }

    /// The position of the symbol named `name` within this frame, ignoring
    /// parents.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.data.borrow().index.get(name).copied()
    }

    /// Resolves `name` in this frame or, failing that, in a parent frame.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        let data = self.data.borrow();
        match data.index.get(name) {
            Some(&index) => Some(data.symbols[index].clone()),
            None => data.parent.as_ref().and_then(|parent| parent.resolve(name)),
        }
    }

    pub fn parent(&self) -> Option<Frame> {
        self.data.borrow().parent.clone()
    }

    /// Handle identity. This is the notion of equality used for record and
    /// scalar-set types.
    pub fn same(&self, other: &Frame) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Frame {}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_list()
            .entries(data.symbols.iter().map(Symbol::name))
            .finish()
    }
}
