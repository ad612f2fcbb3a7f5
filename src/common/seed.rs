// Default content for a fresh deployment and for the offline demo mode
use crate::common::models::Collection;
use serde_json::{json, Value};

pub fn settings() -> Value {
    json!({
        "siteTitle": "Giulia's 40th Birthday",
        "eventDate": "2025-06-14",
        "eventLocation": "Villa Ortensia, Lake Como",
        "primaryColor": "#c2185b",
        "secondaryColor": "#f8bbd0",
        "header": { "subtitle": "Three days of friends, food and music" },
        "footer": { "text": "Made with love for Giulia" }
    })
}

pub fn events() -> Vec<Value> {
    vec![
        json!({
            "title": "Welcome Dinner",
            "day": "Friday",
            "date": "2025-06-13",
            "startTime": "19:30",
            "endTime": "23:00",
            "location": "Trattoria del Porto",
            "description": "Informal dinner for everyone arriving on Friday.",
            "dressCode": "Smart casual"
        }),
        json!({
            "title": "Boat Trip",
            "day": "Saturday",
            "date": "2025-06-14",
            "startTime": "10:00",
            "endTime": "13:00",
            "location": "Pier 3, Bellagio",
            "description": "Morning on the lake. Bring sunscreen."
        }),
        json!({
            "title": "Birthday Party",
            "day": "Saturday",
            "date": "2025-06-14",
            "startTime": "20:00",
            "endTime": "02:00",
            "location": "Villa Ortensia",
            "description": "Dinner, cake and dancing.",
            "dressCode": "Black tie optional"
        }),
        json!({
            "title": "Farewell Brunch",
            "day": "Sunday",
            "date": "2025-06-15",
            "startTime": "11:00",
            "endTime": "14:00",
            "location": "Villa Ortensia garden"
        }),
    ]
}

pub fn contacts() -> Vec<Value> {
    vec![
        json!({
            "name": "Giulia Rossi",
            "email": "giulia@example.com",
            "phone": "+39 333 000 0001",
            "type": "Host",
            "description": "The birthday girl"
        }),
        json!({
            "name": "Marco Bianchi",
            "phone": "+39 333 000 0002",
            "whatsapp": "+39 333 000 0002",
            "type": "Host",
            "description": "Logistics and transport"
        }),
        json!({
            "name": "Villa Ortensia",
            "phone": "+39 031 000 000",
            "type": "Venue"
        }),
    ]
}

pub fn reminders() -> Vec<Value> {
    vec![
        json!({
            "title": "RSVP deadline",
            "description": "Please confirm attendance by May 1st.",
            "date": "2025-05-01",
            "icon": "calendar",
            "sendWhatsapp": true
        }),
        json!({
            "title": "Bring a swimsuit",
            "description": "The villa has a pool.",
            "icon": "sun",
            "sendWhatsapp": false
        }),
    ]
}

pub fn notes() -> Vec<Value> {
    vec![json!({
        "title": "Gifts",
        "content": "Your presence is the gift. If you insist, there is a shared fund for a trip.",
        "displayLocation": "home"
    })]
}

/// Seed records for a list collection. Gallery and settings have no list seed.
pub fn records(collection: Collection) -> Vec<Value> {
    match collection {
        Collection::Events => events(),
        Collection::Contacts => contacts(),
        Collection::Reminders => reminders(),
        Collection::Notes => notes(),
        Collection::Gallery | Collection::Settings => Vec::new(),
    }
}
