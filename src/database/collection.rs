/// Storage kind of a field; drives value coercion and SQL casts in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Text,
    Number,
    Boolean,
    TextArray,
    Timestamp,
    GeoPoint,
}

impl FieldKind {
    /// Cast suffix appended to bound parameters compared against this kind
    pub fn param_cast(&self) -> &'static str {
        match self {
            FieldKind::Id => "::uuid",
            FieldKind::Number => "::float8",
            FieldKind::Timestamp => "::timestamptz",
            FieldKind::Text | FieldKind::Boolean | FieldKind::TextArray | FieldKind::GeoPoint => "",
        }
    }
}

/// A public (API) field and the column backing it
#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
    /// Hidden fields are never projected, filtered or sorted on through the API
    pub hidden: bool,
}

impl Field {
    const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind, hidden: false }
    }

    const fn hidden(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind, hidden: true }
    }
}

/// Descriptor of a stored record type: its table and addressable fields
#[derive(Debug)]
pub struct Collection {
    pub table: &'static str,
    /// Singular display name used in client-facing messages
    pub resource: &'static str,
    pub fields: &'static [Field],
}

impl Collection {
    /// Look up a visible field by its API name
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        let fields: &'static [Field] = self.fields;
        fields.iter().find(|f| !f.hidden && f.name == name)
    }

    pub fn id_field(&self) -> &'static Field {
        let fields: &'static [Field] = self.fields;
        &fields[0]
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &'static Field> {
        let fields: &'static [Field] = self.fields;
        fields.iter().filter(|f| !f.hidden)
    }

    /// Select list of every visible field, aliased to its API name
    pub fn projection(&self) -> String {
        projection(self.visible_fields())
    }
}

/// `"column" AS "name"` pairs so rows serialize in the public shape
pub fn projection<'a>(fields: impl IntoIterator<Item = &'a Field>) -> String {
    fields
        .into_iter()
        .map(|f| format!("\"{}\" AS \"{}\"", f.column, f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

pub static BOOTCAMPS: Collection = Collection {
    table: "bootcamps",
    resource: "Bootcamp",
    fields: &[
        Field::new("id", "id", FieldKind::Id),
        Field::new("name", "name", FieldKind::Text),
        Field::new("slug", "slug", FieldKind::Text),
        Field::new("description", "description", FieldKind::Text),
        Field::new("website", "website", FieldKind::Text),
        Field::new("phone", "phone", FieldKind::Text),
        Field::new("email", "email", FieldKind::Text),
        Field::new("location", "location", FieldKind::GeoPoint),
        Field::new("careers", "careers", FieldKind::TextArray),
        Field::new("averageRating", "average_rating", FieldKind::Number),
        Field::new("averageCost", "average_cost", FieldKind::Number),
        Field::new("photo", "photo", FieldKind::Text),
        Field::new("housing", "housing", FieldKind::Boolean),
        Field::new("jobAssistance", "job_assistance", FieldKind::Boolean),
        Field::new("jobGuarantee", "job_guarantee", FieldKind::Boolean),
        Field::new("acceptGi", "accept_gi", FieldKind::Boolean),
        Field::new("createdAt", "created_at", FieldKind::Timestamp),
        Field::new("updatedAt", "updated_at", FieldKind::Timestamp),
    ],
};

pub static USERS: Collection = Collection {
    table: "users",
    resource: "User",
    fields: &[
        Field::new("id", "id", FieldKind::Id),
        Field::new("name", "name", FieldKind::Text),
        Field::new("email", "email", FieldKind::Text),
        Field::new("role", "role", FieldKind::Text),
        Field::hidden("password", "password", FieldKind::Text),
        Field::hidden("resetPasswordToken", "reset_password_token", FieldKind::Text),
        Field::hidden("resetPasswordExpire", "reset_password_expire", FieldKind::Timestamp),
        Field::new("createdAt", "created_at", FieldKind::Timestamp),
        Field::new("updatedAt", "updated_at", FieldKind::Timestamp),
    ],
};
