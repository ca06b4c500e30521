// Exported with `pub(crate) use` as well so that `macros::<macro>!` paths
// work from both the library and the binary.
#![allow(unused_imports)]

#[macro_export]
macro_rules! global {
    ($x:ident) => {
        $crate::globals::G.$x.lock().unwrap()
    };
}

#[macro_export]
macro_rules! global_set {
    ($x:ident) => {
        *$crate::globals::G.$x.lock().unwrap()
    };
}

/// `println!` that honours quiet mode
#[macro_export]
macro_rules! printf {
    ($($arg:tt)*) => (
        if !*$crate::global!(quiet) {
            println!($($arg)*);
        }
    );
}

pub(crate) use global;
pub(crate) use global_set;
pub(crate) use printf;
