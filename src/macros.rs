// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Convenience macro for building a [`Path`](crate::Path).
///
/// Segments are separated by `/`. A segment is a node name, optionally followed by list entry
/// keys in brackets, or by `[. = value]` for a leaf-list entry.
///
/// ```rust
/// # use yangtree::{path, Path, PathArgument};
/// let path = path!("top" / "list"[id = 1u64] / "tags"[. = "a"]);
/// assert_eq!(
///     path,
///     Path::from_iter([
///         PathArgument::node("top"),
///         PathArgument::entry("list", [("id", 1u64)]),
///         PathArgument::leaf_list_entry("tags", "a"),
///     ])
/// );
/// assert_eq!(path!(), Path::root());
/// ```
#[macro_export]
macro_rules! path {
    (@push $path:ident; $name:literal [ . = $value:expr ] $(/ $($rest:tt)+)?) => {
        $path.push($crate::PathArgument::leaf_list_entry($name, $value));
        $( $crate::path!(@push $path; $($rest)+); )?
    };
    (@push $path:ident; $name:literal [ $($key:ident = $value:expr),+ $(,)? ] $(/ $($rest:tt)+)?) => {
        $path.push($crate::PathArgument::entry(
            $name,
            [$((stringify!($key), $crate::Value::from($value))),+],
        ));
        $( $crate::path!(@push $path; $($rest)+); )?
    };
    (@push $path:ident; $name:literal $(/ $($rest:tt)+)?) => {
        $path.push($crate::PathArgument::node($name));
        $( $crate::path!(@push $path; $($rest)+); )?
    };
    () => {
        $crate::Path::root()
    };
    ($($segments:tt)+) => {{
        let mut path = $crate::Path::root();
        $crate::path!(@push path; $($segments)+);
        path
    }};
}
