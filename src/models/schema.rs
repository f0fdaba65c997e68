use super::Role;

/// Input kind of a listing field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Single-line text
    Text,
    /// Multi-line text
    TextArea,
    /// Numeric input, optionally bounded below
    Number { min: Option<f64> },
}

/// Declaration of one editable listing field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Wire name (camelCase, as the backend expects it)
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub placeholder: &'static str,
}

impl FieldSpec {
    const fn text(name: &'static str, label: &'static str, placeholder: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
            required: false,
            placeholder,
        }
    }

    const fn text_area(name: &'static str, label: &'static str, placeholder: &'static str) -> Self {
        Self {
            kind: FieldKind::TextArea,
            ..Self::text(name, label, placeholder)
        }
    }

    const fn number(
        name: &'static str,
        label: &'static str,
        placeholder: &'static str,
        min: f64,
    ) -> Self {
        Self {
            kind: FieldKind::Number { min: Some(min) },
            ..Self::text(name, label, placeholder)
        }
    }

    const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }
}

/// Field layout and status set for one role's listings
#[derive(Debug, PartialEq)]
pub struct RoleSchema {
    pub role: Role,
    /// Human name of a single listing, e.g. "Farmer Post"
    pub noun: &'static str,
    pub fields: &'static [FieldSpec],
    /// Closed set of allowed statuses; the first entry is the default
    pub statuses: &'static [&'static str],
    /// Field used to name a listing in prompts
    pub headline: &'static str,
}

impl RoleSchema {
    pub fn default_status(&self) -> &'static str {
        self.statuses[0]
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_status(&self, value: &str) -> bool {
        self.statuses.contains(&value)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

pub static FARMER: RoleSchema = RoleSchema {
    role: Role::Farmer,
    noun: "Farmer Post",
    fields: &[
        FieldSpec::text("title", "Title", "e.g., Urgent Rice Harvesting Needed").required(),
        FieldSpec::text("area", "Area", "e.g., 10 Acres, 5 Hectares").required(),
        FieldSpec::number("price", "Price (₹)", "e.g., 5000", 0.0).required(),
        FieldSpec::text("workTime", "Work Time", "e.g., 8 AM - 5 PM, Flexible").required(),
        FieldSpec::text_area(
            "description",
            "Description",
            "Detailed description of the work involved",
        ),
    ],
    statuses: &["Active", "Inactive"],
    headline: "title",
};

pub static DRIVER: RoleSchema = RoleSchema {
    role: Role::Driver,
    noun: "Driver Post",
    fields: &[
        FieldSpec::text("title", "Title", "e.g., Local Goods Transport").required(),
        FieldSpec::text("serviceArea", "Service Area", "e.g., City Center, Nearby Towns").required(),
        FieldSpec::text("rate", "Rate", "e.g., ₹1500 / Trip, ₹50 / km").required(),
        FieldSpec::text("availability", "Availability", "e.g., Mon - Fri, 9 AM to 5 PM").required(),
        FieldSpec::text_area(
            "description",
            "Description",
            "Vehicle details, service offered, etc.",
        )
        .required(),
    ],
    statuses: &["Active", "Inactive", "Booked"],
    headline: "title",
};

pub static SELLER: RoleSchema = RoleSchema {
    role: Role::Seller,
    noun: "Seller Post",
    fields: &[
        FieldSpec::text("title", "Title", "e.g., Organic Wheat Batch A").required(),
        FieldSpec::text("produceType", "Produce Type", "e.g., Wheat, Tomatoes, Mangoes").required(),
        FieldSpec::text("quantity", "Quantity", "e.g., 10 Quintals, 50 kg"),
        FieldSpec::text("pricePerUnit", "Price per Unit", "e.g., ₹2000 / Quintal, ₹50 / kg")
            .required(),
        FieldSpec::text("location", "Location", "e.g., Village Name, District").required(),
        FieldSpec::text_area(
            "description",
            "Description",
            "Quality, harvest date, organic status, etc.",
        )
        .required(),
    ],
    statuses: &["Available", "Sold Out", "Inactive"],
    headline: "title",
};

pub static BUYER: RoleSchema = RoleSchema {
    role: Role::Buyer,
    noun: "Buyer Requirement",
    fields: &[
        FieldSpec::text(
            "itemNeeded",
            "Item Needed",
            "e.g., Wheat Seeds, Tractor Rental, Land Lease",
        )
        .required(),
        FieldSpec::text("itemCategory", "Category", "e.g., Seeds, Equipment, Land, Labour")
            .required(),
        FieldSpec::text("quantity", "Quantity", "e.g., 50 kg, 1 Unit, 10 Acres"),
        FieldSpec::text_area(
            "specifications",
            "Specifications",
            "e.g., Organic Certified, Minimum 30 HP, Specific dates",
        ),
        FieldSpec::text("location", "Location", "e.g., Village Name, District").required(),
        FieldSpec::text("budget", "Budget", "e.g., Approx ₹5000, Market Rate"),
    ],
    statuses: &["Open", "Fulfilled", "Closed", "Inactive"],
    headline: "itemNeeded",
};
