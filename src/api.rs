pub mod renewables_ninja;
