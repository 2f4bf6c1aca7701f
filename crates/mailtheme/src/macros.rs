//! Macros for ergonomic schema definition

/// Macro for declarative schema definition
///
/// # Examples
///
/// ```rust
/// use mailtheme::schema;
///
/// let schema = schema! {
///     name: String,
///     email: String,
///     age?: Number,
///     active: Boolean,
///     company?: { name: String, logo?: String },
///     tags?: [String]
/// };
/// assert_eq!(schema.fields.len(), 6);
/// ```
#[macro_export]
macro_rules! schema {
    // Handle empty schema
    {} => {
        $crate::Schema::new()
    };

    // Required field: name: Type
    ($name:ident: $type:tt $(, $($rest:tt)*)?) => {
        {
            let mut builder = $crate::Schema::builder();
            builder = builder.field(stringify!($name), $crate::schema!(@type $type));
            $(
                builder = $crate::schema!(@parse builder, $($rest)*);
            )?
            builder.build()
        }
    };

    // Optional field: name?: Type
    ($name:ident ?: $type:tt $(, $($rest:tt)*)?) => {
        {
            let mut builder = $crate::Schema::builder();
            builder = builder.optional(stringify!($name), $crate::schema!(@type $type));
            $(
                builder = $crate::schema!(@parse builder, $($rest)*);
            )?
            builder.build()
        }
    };

    // Trailing comma
    (@parse $builder:expr, ) => {
        $builder
    };

    // Parse additional fields
    (@parse $builder:expr, $name:ident: $type:tt $(, $($rest:tt)*)?) => {
        {
            #[allow(unused_mut)]
            let mut builder = $builder.field(stringify!($name), $crate::schema!(@type $type));
            $(
                builder = $crate::schema!(@parse builder, $($rest)*);
            )?
            builder
        }
    };

    (@parse $builder:expr, $name:ident ?: $type:tt $(, $($rest:tt)*)?) => {
        {
            #[allow(unused_mut)]
            let mut builder = $builder.optional(stringify!($name), $crate::schema!(@type $type));
            $(
                builder = $crate::schema!(@parse builder, $($rest)*);
            )?
            builder
        }
    };

    // Type mappings
    (@type String) => { $crate::FieldType::String };
    (@type Number) => { $crate::FieldType::Number };
    (@type Boolean) => { $crate::FieldType::Boolean };
    (@type Date) => { $crate::FieldType::Date };
    (@type [$item:tt]) => {
        $crate::FieldType::Array(Box::new($crate::schema!(@type $item)))
    };
    (@type { $($inner:tt)* }) => {
        $crate::FieldType::Object(Box::new($crate::schema! { $($inner)* }))
    };
}
