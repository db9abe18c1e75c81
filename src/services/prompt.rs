use crate::types::TripRequest;

/// System message sent with every itinerary request
pub const SYSTEM_PROMPT: &str = "You are a travel planning expert. Generate detailed, realistic itineraries based on user preferences. Always respond with valid JSON only.";

const RESPONSE_TEMPLATE: &str = r#"{
  "title": "Trip title",
  "description": "Brief description of the itinerary",
  "dailyPlans": [
    {
      "day": 1,
      "date": "YYYY-MM-DD",
      "activities": [
        {
          "time": "HH:MM",
          "activity": "Activity name",
          "description": "Detailed description",
          "cost": 50,
          "category": "activities"
        }
      ],
      "meals": [
        {
          "type": "breakfast",
          "suggestion": "Restaurant or food suggestion",
          "cost": 15
        }
      ],
      "notes": "Optional notes for the day"
    }
  ],
  "totalCostEstimate": 1500,
  "tips": ["Tip 1", "Tip 2"]
}"#;

const FOCUS_AREAS: [&str; 6] = [
    "Realistic costs within the budget",
    "Activities matching interests",
    "Local experiences and culture",
    "Weather-appropriate activities",
    "Group size considerations",
    "Balance between popular attractions and hidden gems",
];

/// Build the itinerary prompt for a trip request
pub fn build_itinerary_prompt(request: &TripRequest) -> String {
    let interests = if request.interests().is_empty() {
        "none specified".to_string()
    } else {
        request.interests().join(", ")
    };

    let accommodation = request
        .accommodation
        .map(|pref| pref.as_str())
        .unwrap_or("flexible");
    let transportation = request
        .transportation
        .map(|pref| pref.as_str())
        .unwrap_or("flexible");

    let focus = FOCUS_AREAS
        .iter()
        .map(|area| format!("- {}", area))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate a detailed travel itinerary for a trip to {destination} from {start} to {end} ({days} days).\n\n\
Trip Details:\n\
- Budget: ${budget}\n\
- Group size: {group} people\n\
- Interests: {interests}\n\
- Accommodation preference: {accommodation}\n\
- Transportation: {transportation}\n\n\
Please provide a JSON response with the following structure:\n\
{template}\n\n\
Include exactly one entry in dailyPlans per day, numbered from 1 with consecutive dates.\n\n\
Focus on:\n\
{focus}\n\n\
IMPORTANT: Respond ONLY with valid JSON. Do not include any text before or after the JSON.",
        destination = request.destination,
        start = request.start_date,
        end = request.end_date,
        days = request.day_count(),
        budget = request.budget,
        group = request.group_size,
        interests = interests,
        accommodation = accommodation,
        transportation = transportation,
        template = RESPONSE_TEMPLATE,
        focus = focus,
    )
}
