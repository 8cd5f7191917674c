//! Declaration macros for event sets and emitter capabilities.

/// Declares a closed event set.
///
/// Writes the enum as given and implements [`Event`](crate::Event) for it,
/// [`Kind`](crate::Kind) for each payload type (indices follow declaration
/// order), and `From<Payload>` for the enum. Every variant must be a
/// one-field tuple variant and every payload type may appear once.
///
/// The enum must be `Debug + Clone`; derive them on the declaration.
///
/// ```rust
/// use switchyard_core::{event_set, Event};
///
/// #[derive(Debug, Clone)]
/// pub struct Tick(pub u64);
///
/// event_set! {
///     #[derive(Debug, Clone)]
///     pub enum Clock {
///         Tick(Tick),
///     }
/// }
///
/// assert_eq!(Clock::KIND_COUNT, 1);
/// ```
#[macro_export]
macro_rules! event_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident($payload:ty) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant($payload), )+
        }

        // SAFETY: `kind()` returns the `INDEX` of the payload's own `Kind` impl.
        #[allow(unsafe_code)]
        unsafe impl $crate::Event for $name {
            const KIND_COUNT: usize = [$(stringify!($variant)),+].len();

            #[inline]
            fn kind(&self) -> usize {
                match self {
                    $( Self::$variant(_) => <$payload as $crate::Kind<$name>>::INDEX, )+
                }
            }

            fn kind_name(kind: usize) -> &'static str {
                const NAMES: &[&str] = &[$(stringify!($variant)),+];
                match NAMES.get(kind) {
                    ::core::option::Option::Some(&name) => name,
                    ::core::option::Option::None => "<unknown>",
                }
            }
        }

        const _: () = assert!(
            <$name as $crate::Event>::KIND_COUNT <= $crate::KindSet::CAPACITY,
            "too many kinds in one event set",
        );

        $crate::__event_kinds!($name; 0usize; $( $variant($payload), )+);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __event_kinds {
    ($name:ident; $index:expr; ) => {};
    ($name:ident; $index:expr; $variant:ident($payload:ty), $($rest:tt)*) => {
        // SAFETY: `into_event` builds the variant whose `kind()` is this `INDEX`,
        // and indices count up once per variant.
        #[allow(unsafe_code)]
        unsafe impl $crate::Kind<$name> for $payload {
            const INDEX: usize = $index;

            #[inline]
            fn into_event(self) -> $name {
                $name::$variant(self)
            }

            #[allow(unreachable_patterns)]
            #[inline]
            fn try_from_event(event: $name) -> ::core::result::Result<Self, $name> {
                match event {
                    $name::$variant(payload) => ::core::result::Result::Ok(payload),
                    other => ::core::result::Result::Err(other),
                }
            }

            #[allow(unreachable_patterns)]
            #[inline]
            fn from_ref(event: &$name) -> ::core::option::Option<&Self> {
                match event {
                    $name::$variant(payload) => ::core::option::Option::Some(payload),
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unreachable_patterns)]
            #[inline]
            fn from_mut(event: &mut $name) -> ::core::option::Option<&mut Self> {
                match event {
                    $name::$variant(payload) => ::core::option::Option::Some(payload),
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl ::core::convert::From<$payload> for $name {
            #[inline]
            fn from(payload: $payload) -> Self {
                $name::$variant(payload)
            }
        }

        $crate::__event_kinds!($name; $index + 1usize; $($rest)*);
    };
}

/// Builds a [`KindSet`](crate::KindSet) from payload types of an event set.
///
/// ```rust
/// # use switchyard_core::{event_set, kinds, KindSet};
/// # #[derive(Debug, Clone)] pub struct A;
/// # #[derive(Debug, Clone)] pub struct B;
/// # event_set! { #[derive(Debug, Clone)] pub enum Ev { A(A), B(B) } }
/// const BOTH: KindSet = kinds!(Ev => A, B);
/// assert_eq!(BOTH.len(), 2);
/// ```
#[macro_export]
macro_rules! kinds {
    ($event:ty => $($kind:ty),* $(,)?) => {
        $crate::KindSet::from_indices(&[$( <$kind as $crate::Kind<$event>>::INDEX ),*])
    };
}

/// Declares which kinds a receiver or external emitter may emit.
///
/// Implements [`Emitter`](crate::Emitter) with the listed kinds and the
/// matching [`Emits`](crate::Emits) capabilities. An empty list declares a
/// component that emits nothing.
///
/// ```rust
/// # use switchyard_core::{emits, event_set, Emitter, KindSet};
/// # #[derive(Debug, Clone)] pub struct Sample(pub u32);
/// # event_set! { #[derive(Debug, Clone)] pub enum Ev { Sample(Sample) } }
/// struct Feeder;
/// emits!(Feeder: Ev => Sample);
///
/// struct Quiet;
/// emits!(Quiet: Ev =>);
///
/// assert_eq!(<Feeder as Emitter<Ev>>::EMITS.len(), 1);
/// assert!(<Quiet as Emitter<Ev>>::EMITS.is_empty());
/// ```
#[macro_export]
macro_rules! emits {
    ($decl:ty : $event:ty => $($kind:ty),* $(,)?) => {
        impl $crate::Emitter<$event> for $decl {
            const EMITS: $crate::KindSet = $crate::kinds!($event => $($kind),*);
        }

        $(
            // SAFETY: the kind is part of `EMITS` above.
            #[allow(unsafe_code)]
            unsafe impl $crate::Emits<$event, $kind> for $decl {}
        )*
    };
}
